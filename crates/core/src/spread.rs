//! The spread diffusion permutation.
//!
//! A buffer is viewed as macro-blocks (one primitive block each), every
//! macro-block split into `fanout` mini-blocks. At level `l` the buffer
//! divides into slabs of `fanout^l` macro-blocks, each slab into `fanout`
//! sub-slabs. Within a slab, the mini-block at position `m` of a macro-block
//! in sub-slab `s` trades places with the mini-block at position `s` of the
//! corresponding macro-block of sub-slab `m`; afterwards every mini-block
//! sits in the sub-slab named by its original position. Interleaved with mix
//! passes, this is what makes every output byte depend on every input byte.

use std::ptr;

use crate::ctx::Fanout;

/// Applies the level-`level` spread to the whole buffer, in place.
///
/// `buf.len()` must be a multiple of the level's slab size.
pub(crate) fn spread(buf: &mut [u8], level: u32, block_size: usize, fanout: Fanout) {
    debug_assert!(level >= 1);
    let f = fanout.as_usize();
    let mini_size = block_size / f;
    let prev_macros = f.pow(level - 1);
    let macros = buf.len() / block_size;
    debug_assert_eq!(macros % (f * prev_macros), 0);

    for g in 0..macros {
        let sub_slab = (g / prev_macros) % f;
        for mini in sub_slab + 1..f {
            let from = g * block_size + mini * mini_size;
            let to = (g + prev_macros * (mini - sub_slab)) * block_size + sub_slab * mini_size;
            swap_ranges(buf, from, to, mini_size);
        }
    }
}

/// Swaps `buf[a..a + len]` with `buf[b..b + len]`; requires `a + len <= b`.
fn swap_ranges(buf: &mut [u8], a: usize, b: usize, len: usize) {
    let (head, tail) = buf.split_at_mut(b);
    head[a..a + len].swap_with_slice(&mut tail[..len]);
}

/// Applies the level-`level` spread for the macro-blocks owned by one thread,
/// reaching into the shared buffer through `base`.
///
/// Each swap pair is walked by exactly one thread (the one owning the
/// lower macro-block), and distinct swap pairs never share bytes, so threads
/// running this concurrently over disjoint macro ranges touch disjoint
/// memory.
///
/// # Safety
///
/// `base` must point to a live buffer covering every macro-block any swap
/// reaches (the level's slab size divides the total macro count), and for the
/// duration of the call no thread may access the buffer other than through
/// this function at the same level.
pub(crate) unsafe fn spread_chunks(
    base: *mut u8,
    block_size: usize,
    fanout: Fanout,
    level: u32,
    first_macro: usize,
    macro_count: usize,
) {
    debug_assert!(level >= 1);
    let f = fanout.as_usize();
    let mini_size = block_size / f;
    let prev_macros = f.pow(level - 1);

    for g in first_macro..first_macro + macro_count {
        let sub_slab = (g / prev_macros) % f;
        for mini in sub_slab + 1..f {
            let from = base.add(g * block_size + mini * mini_size);
            let to = base
                .add((g + prev_macros * (mini - sub_slab)) * block_size + sub_slab * mini_size);
            ptr::swap_nonoverlapping(from, to, mini_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(macros: usize, block_size: usize) -> Vec<u8> {
        (0..macros * block_size).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn first_level_interleaves_neighbouring_macros() {
        // Two 4-byte macro-blocks, fanout 2: the second half of block 0 and
        // the first half of block 1 trade places.
        let mut buf = vec![0, 1, 2, 3, 4, 5, 6, 7];
        spread(&mut buf, 1, 4, Fanout::Two);
        assert_eq!(buf, vec![0, 1, 4, 5, 2, 3, 6, 7]);
    }

    #[test]
    fn chunked_walk_matches_whole_buffer_walk() {
        let block_size = 12;
        let fanout = Fanout::Three;
        let macros = 27;
        for level in 1..=3 {
            let mut whole = labelled(macros, block_size);
            spread(&mut whole, level, block_size, fanout);

            for threads in [3usize, 9] {
                let mut chunked = labelled(macros, block_size);
                let mut first = 0;
                for t in 0..threads {
                    let count = macros / threads + usize::from(t < macros % threads);
                    unsafe {
                        spread_chunks(chunked.as_mut_ptr(), block_size, fanout, level, first, count);
                    }
                    first += count;
                }
                assert_eq!(whole, chunked, "level {level} with {threads} chunks");
            }
        }
    }

    #[test]
    fn spread_permutes_mini_blocks() {
        let block_size = 12;
        let fanout = Fanout::Three;
        let macros = 9;
        let mini_size = block_size / 3;

        // Give every mini-block a unique label so the permutation is visible.
        let mut buf = vec![0u8; macros * block_size];
        for (index, mini) in buf.chunks_exact_mut(mini_size).enumerate() {
            mini.fill(index as u8);
        }
        let original = buf.clone();

        for level in 1..=2 {
            let mut spreaded = original.clone();
            spread(&mut spreaded, level, block_size, fanout);

            let label_of = |data: &[u8], mini: usize| data[mini * mini_size];
            let minis = macros * 3;

            // Same multiset of labels, and a bijection we can invert.
            let mut seen = vec![false; minis];
            let mut mapping = vec![0usize; minis];
            for target in 0..minis {
                let label = label_of(&spreaded, target) as usize;
                assert!(!seen[label], "mini-block {label} duplicated");
                seen[label] = true;
                mapping[label] = target;
            }

            // Applying the inverse permutation restores the input.
            let mut restored = vec![0u8; original.len()];
            for source in 0..minis {
                let target = mapping[source];
                restored[source * mini_size..(source + 1) * mini_size]
                    .copy_from_slice(&spreaded[target * mini_size..(target + 1) * mini_size]);
            }
            assert_eq!(restored, original, "level {level}");
        }
    }

    #[test]
    fn mini_blocks_land_in_their_named_sub_slab() {
        let block_size = 8;
        let fanout = Fanout::Two;
        let macros = 8;
        let mini_size = 4;

        let mut buf = vec![0u8; macros * block_size];
        for (index, mini) in buf.chunks_exact_mut(mini_size).enumerate() {
            mini.fill(index as u8);
        }

        spread(&mut buf, 3, block_size, fanout);

        // At the top level the slab is the whole buffer: minis originally at
        // position 0 must now live in the first sub-slab, position-1 minis in
        // the second.
        let half = macros / 2 * block_size;
        for (offset, mini) in buf.chunks_exact(mini_size).enumerate() {
            let original_position = (mini[0] as usize) % 2;
            let in_second_sub_slab = offset * mini_size >= half;
            assert_eq!(original_position == 1, in_second_sub_slab);
        }
    }
}
