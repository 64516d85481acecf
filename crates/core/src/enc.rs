//! Keystream expansion and XOR-stream encryption.
//!
//! A stream larger than the key is produced by re-running the keymix with a
//! fresh counter for every key-sized span. The invocations are independent,
//! so they fan out across external worker threads, each owning a disjoint
//! slice of the output and a contiguous counter range.

use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use zeroize::Zeroizing;

use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::keymix::keymix;
use crate::params::{COUNTER_OFFSET, COUNTER_SIZE, IV_SIZE};

/// Fills `out` with keystream, starting the counter sequence at
/// `starting_counter`.
///
/// The context must be an expansion context. `external_threads` workers run
/// whole keymix invocations in parallel; each invocation itself uses
/// `internal_threads` threads.
pub fn keymix_stream(
    ctx: &Ctx,
    out: &mut [u8],
    external_threads: usize,
    internal_threads: usize,
    starting_counter: u32,
) -> Result<()> {
    if ctx.is_encrypt() {
        return Err(Error::ExpansionContextRequired);
    }
    run_stream(ctx, None, out, external_threads, internal_threads, starting_counter)
}

/// Encrypts (or decrypts) `input` into `out` by XORing it with the
/// keystream.
///
/// The context must be an encryption context, so every working key gets the
/// IV and a counter. Applying the same call to the ciphertext recovers the
/// plaintext.
pub fn encrypt(
    ctx: &Ctx,
    input: &[u8],
    out: &mut [u8],
    external_threads: usize,
    internal_threads: usize,
    starting_counter: u32,
) -> Result<()> {
    if !ctx.is_encrypt() || !ctx.applies_iv_counter() {
        return Err(Error::EncryptionContextRequired);
    }
    if input.len() != out.len() {
        return Err(Error::LengthMismatch { input: input.len(), output: out.len() });
    }
    run_stream(ctx, Some(input), out, external_threads, internal_threads, starting_counter)
}

/// One external worker's share of the stream.
struct Job<'a> {
    input: Option<&'a [u8]>,
    out: &'a mut [u8],
    keys: u64,
    counter: u32,
}

fn run_stream(
    ctx: &Ctx,
    input: Option<&[u8]>,
    out: &mut [u8],
    external_threads: usize,
    internal_threads: usize,
    starting_counter: u32,
) -> Result<()> {
    if out.is_empty() {
        return Ok(());
    }

    let key_size = ctx.key_size();
    let total_keys = (out.len() as u64).div_ceil(key_size as u64);
    let workers = external_threads.max(1).min(total_keys as usize);
    debug!("stream: {total_keys} keymix invocations across {workers} workers");

    let jobs = partition(input, out, key_size, total_keys, workers, starting_counter);

    #[cfg(feature = "parallel")]
    {
        jobs.into_par_iter()
            .map(|job| run_job(ctx, job, internal_threads))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        for job in jobs {
            run_job(ctx, job, internal_threads)?;
        }
        Ok(())
    }
}

/// Splits the stream into per-worker jobs: the first `total_keys % workers`
/// workers take one extra invocation, and counters stay contiguous.
fn partition<'a>(
    mut input: Option<&'a [u8]>,
    mut out: &'a mut [u8],
    key_size: usize,
    total_keys: u64,
    workers: usize,
    starting_counter: u32,
) -> Vec<Job<'a>> {
    let base = total_keys / workers as u64;
    let extra = (total_keys % workers as u64) as usize;

    let mut jobs = Vec::with_capacity(workers);
    let mut counter = starting_counter;
    for id in 0..workers {
        let keys = base + u64::from(id < extra);
        let span = ((keys * key_size as u64) as usize).min(out.len());

        let (chunk, rest) = out.split_at_mut(span);
        out = rest;
        let in_chunk = match input {
            Some(whole) => {
                let (head, rest) = whole.split_at(span);
                input = Some(rest);
                Some(head)
            }
            None => None,
        };

        jobs.push(Job { input: in_chunk, out: chunk, keys, counter });
        counter = counter.wrapping_add(keys as u32);
    }
    jobs
}

fn run_job(ctx: &Ctx, job: Job<'_>, internal_threads: usize) -> Result<()> {
    let key_size = ctx.key_size();

    // Private working key; the shared key is never written.
    let mut working = Zeroizing::new(ctx.key().to_vec());
    if ctx.applies_iv_counter() {
        apply_iv(&mut working, ctx.iv());
        bump_counter(&mut working, job.counter);
    }

    // The keymix always emits a whole key of stream, so the tail of the
    // output goes through this buffer instead of the caller's slice.
    let mut keystream = Zeroizing::new(vec![0u8; key_size]);

    let mut offset = 0;
    for _ in 0..job.keys {
        keymix(ctx, &working, &mut keystream, internal_threads)?;

        let take = key_size.min(job.out.len() - offset);
        match job.input {
            Some(input) => xor_into(
                &mut job.out[offset..offset + take],
                &keystream[..take],
                &input[offset..offset + take],
            ),
            None => job.out[offset..offset + take].copy_from_slice(&keystream[..take]),
        }

        if ctx.applies_iv_counter() {
            bump_counter(&mut working, 1);
        }
        offset += take;
    }
    Ok(())
}

/// XORs the IV over the first 16 bytes of a working key.
fn apply_iv(key: &mut [u8], iv: &[u8; IV_SIZE]) {
    for (dst, byte) in key[..IV_SIZE].iter_mut().zip(iv) {
        *dst ^= byte;
    }
}

/// Adds `step` to the little-endian 32-bit counter at bytes 16..20.
/// Wrapping past 2^32 within one call is a caller error and is not detected.
fn bump_counter(key: &mut [u8], step: u32) {
    let window: [u8; COUNTER_SIZE] =
        key[COUNTER_OFFSET..COUNTER_OFFSET + COUNTER_SIZE].try_into().unwrap();
    let value = u32::from_le_bytes(window).wrapping_add(step);
    key[COUNTER_OFFSET..COUNTER_OFFSET + COUNTER_SIZE].copy_from_slice(&value.to_le_bytes());
}

fn xor_into(dst: &mut [u8], a: &[u8], b: &[u8]) {
    for ((dst, x), y) in dst.iter_mut().zip(a).zip(b) {
        *dst = x ^ y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_lives_at_bytes_16_to_20() {
        let mut key = vec![0u8; 48];
        bump_counter(&mut key, 1);
        assert_eq!(&key[16..20], &[1, 0, 0, 0]);
        assert!(key[..16].iter().all(|&b| b == 0));
        assert!(key[20..].iter().all(|&b| b == 0));

        bump_counter(&mut key, 0x0100);
        assert_eq!(&key[16..20], &[1, 1, 0, 0]);
    }

    #[test]
    fn counter_wraps_without_spilling() {
        let mut key = vec![0u8; 48];
        key[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        bump_counter(&mut key, 1);
        assert_eq!(&key[16..20], &[0, 0, 0, 0]);
        assert_eq!(key[20], 0);
    }

    #[test]
    fn iv_touches_only_the_first_block() {
        let mut key = vec![0u8; 48];
        let iv = [0xFFu8; IV_SIZE];
        apply_iv(&mut key, &iv);
        assert!(key[..16].iter().all(|&b| b == 0xFF));
        assert!(key[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn partition_spreads_keys_and_counters() {
        let mut out = vec![0u8; 48 * 7 + 5];
        let jobs = partition(None, &mut out, 48, 8, 3, 10);

        assert_eq!(jobs.len(), 3);
        let keys: Vec<u64> = jobs.iter().map(|job| job.keys).collect();
        assert_eq!(keys, vec![3, 3, 2]);
        let counters: Vec<u32> = jobs.iter().map(|job| job.counter).collect();
        assert_eq!(counters, vec![10, 13, 16]);

        // The tail lands in the last job.
        assert_eq!(jobs[0].out.len(), 48 * 3);
        assert_eq!(jobs[2].out.len(), 48 + 5);
    }
}
