//! Benchmarks for the keymix engine and the stream driver.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keymix_core::{keymix, keymix_stream, Ctx, Fanout, MixType};

fn bench_keymix(c: &mut Criterion) {
    // 3^7 macro-blocks of 48 bytes, ~100 KiB working set.
    let key = vec![0x5Au8; 48 * 2187];
    let ctx = Ctx::expansion(MixType::AesNiMixCtr, &key, Fanout::Three).unwrap();
    let mut out = vec![0u8; key.len()];

    c.bench_function("keymix_mixctr_1t", |b| {
        b.iter(|| keymix(&ctx, black_box(&key), &mut out, 1))
    });
    c.bench_function("keymix_mixctr_3t", |b| {
        b.iter(|| keymix(&ctx, black_box(&key), &mut out, 3))
    });
    c.bench_function("keymix_mixctr_9t", |b| {
        b.iter(|| keymix(&ctx, black_box(&key), &mut out, 9))
    });
}

fn bench_primitives(c: &mut Criterion) {
    // One keymix per primitive family over a comparable working set.
    for primitive in [
        MixType::AesNiMixCtr,
        MixType::Blake3,
        MixType::OpensslSha3_256,
        MixType::XkcpTurboShake128,
    ] {
        let fanout = Fanout::for_block_size(primitive.block_size()).next().unwrap();
        let macros = fanout.as_usize().pow(4);
        let key = vec![0xC3u8; primitive.block_size() * macros];
        let ctx = Ctx::expansion(primitive, &key, fanout).unwrap();
        let mut out = vec![0u8; key.len()];

        let name = format!("keymix_{}", primitive.name());
        c.bench_function(name.as_str(), |b| {
            b.iter(|| keymix(&ctx, black_box(&key), &mut out, 1))
        });
    }
}

fn bench_stream(c: &mut Criterion) {
    let key = vec![0x11u8; 48 * 729];
    let mut ctx = Ctx::expansion(MixType::AesNiMixCtr, &key, Fanout::Three).unwrap();
    ctx.enable_iv_counter([0xABu8; 16]).unwrap();
    let mut out = vec![0u8; 8 * key.len()];

    c.bench_function("stream_8_keys_4_workers", |b| {
        b.iter(|| keymix_stream(&ctx, black_box(&mut out), 4, 1, 0))
    });
}

criterion_group!(benches, bench_keymix, bench_primitives, bench_stream);
criterion_main!(benches);
