//! The layered keymix engine.
//!
//! A keymix is `levels` mix passes with a spread between each pair, where
//! `levels = 1 + log_fanout(macros)`. Multithreaded runs split the buffer
//! into per-thread chunks: the first levels stay inside a chunk and run
//! uncoordinated, the rest swap mini-blocks across chunks and are fenced by
//! a barrier on both sides of every spread. Output is byte-identical for
//! every thread count.

use std::slice;
use std::thread;

use log::debug;

use crate::barrier::Barrier;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::params::exact_log;
use crate::spread::{spread, spread_chunks};

/// Runs one keymix of `input` into `out` with up to `threads` internal
/// threads.
///
/// Both buffers must be exactly one key long. The thread count is clamped to
/// the number of macro-blocks; a power of the fanout lets most levels run
/// without coordination.
pub fn keymix(ctx: &Ctx, input: &[u8], out: &mut [u8], threads: usize) -> Result<()> {
    let key_size = ctx.key_size();
    if input.len() != key_size {
        return Err(Error::BadKeymixSize { size: input.len(), key_size });
    }
    if out.len() != key_size {
        return Err(Error::BadKeymixSize { size: out.len(), key_size });
    }

    let macros = ctx.macros();
    let levels = ctx.levels();
    let threads = threads.clamp(1, macros);
    debug!("keymix: {macros} macros, {levels} levels, {threads} threads");

    if threads == 1 {
        return keymix_inner(ctx, input, out, levels);
    }

    // With a power-of-fanout thread count the chunks stay slab-aligned until
    // the last log_fanout(threads) levels; any other count forces
    // coordination on every level after the first.
    let sync_levels = match exact_log(threads, ctx.fanout().as_usize()) {
        Some(log) => log,
        None => levels - 1,
    };
    debug!("keymix: {sync_levels} synchronized levels");

    let block_size = ctx.block_size();
    let barrier = Barrier::new();
    let shared = SharedOut::new(out);

    let mut results = Vec::with_capacity(threads);
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads);
        let mut in_rest = input;
        let mut first_macro = 0;
        for id in 0..threads {
            let chunk_macros = macros / threads + usize::from(id < macros % threads);
            let (in_chunk, rest) = in_rest.split_at(chunk_macros * block_size);
            in_rest = rest;

            let worker = Worker {
                id,
                threads,
                first_macro,
                chunk_macros,
                sync_levels,
                total_levels: levels,
                in_chunk,
                ctx,
                barrier: &barrier,
                shared: &shared,
            };
            first_macro += chunk_macros;
            handles.push(s.spawn(move || worker.run()));
        }

        for handle in handles {
            results.push(handle.join().unwrap_or(Err(Error::WorkerPanic)));
        }
    });

    results.into_iter().collect()
}

/// Single-threaded layer loop over one buffer: mix, then spread + mix per
/// level.
fn keymix_inner(ctx: &Ctx, input: &[u8], out: &mut [u8], levels: u32) -> Result<()> {
    let primitive = ctx.primitive();
    out.copy_from_slice(input);
    primitive.mix(out)?;
    for level in 1..levels {
        spread(out, level, ctx.block_size(), ctx.fanout());
        primitive.mix(out)?;
    }
    Ok(())
}

/// The whole output buffer, shared across workers through a raw pointer.
///
/// Workers only materialize slices over their own chunk, and only while the
/// schedule guarantees nobody else touches it.
struct SharedOut {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for SharedOut {}
unsafe impl Sync for SharedOut {}

impl SharedOut {
    fn new(buf: &mut [u8]) -> Self {
        SharedOut { ptr: buf.as_mut_ptr(), len: buf.len() }
    }

    /// # Safety
    ///
    /// The caller must guarantee that no other thread accesses
    /// `[start, start + len)` while the returned slice lives.
    unsafe fn slice_mut(&self, start: usize, len: usize) -> &mut [u8] {
        debug_assert!(start + len <= self.len);
        slice::from_raw_parts_mut(self.ptr.add(start), len)
    }
}

struct Worker<'a> {
    id: usize,
    threads: usize,
    first_macro: usize,
    chunk_macros: usize,
    sync_levels: u32,
    total_levels: u32,
    in_chunk: &'a [u8],
    ctx: &'a Ctx,
    barrier: &'a Barrier,
    shared: &'a SharedOut,
}

impl Worker<'_> {
    fn run(self) -> Result<()> {
        let block_size = self.ctx.block_size();
        let start = self.first_macro * block_size;
        let len = self.chunk_macros * block_size;
        let unsync_levels = self.total_levels - self.sync_levels;

        // Uncoordinated prefix: every spread stays inside the chunk.
        //
        // A failing worker keeps joining the barriers below with its work
        // skipped, so its peers still complete every round.
        let mut failure = {
            // SAFETY: each worker owns a disjoint macro range, and no thread
            // reaches outside its own range before the first barrier.
            let chunk = unsafe { self.shared.slice_mut(start, len) };
            keymix_inner(self.ctx, self.in_chunk, chunk, unsync_levels).err()
        };
        debug!("t={}: finished uncoordinated layers", self.id);

        for level in unsync_levels..self.total_levels {
            self.barrier.wait(self.threads);
            if failure.is_none() {
                // SAFETY: between the two barriers every thread performs only
                // level-`level` mini-block swaps over its own macro range;
                // each swap pair belongs to exactly one range and distinct
                // pairs never share bytes, so all accesses are disjoint.
                unsafe {
                    spread_chunks(
                        self.shared.ptr,
                        block_size,
                        self.ctx.fanout(),
                        level,
                        self.first_macro,
                        self.chunk_macros,
                    );
                }
            }
            self.barrier.wait(self.threads);
            if failure.is_none() {
                // SAFETY: after the barrier every thread mixes only its own
                // chunk until the next spread round.
                let chunk = unsafe { self.shared.slice_mut(start, len) };
                failure = self.ctx.primitive().mix(chunk).err();
            }
            debug!("t={}: finished synchronized level {level}", self.id);
        }

        match failure {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}
