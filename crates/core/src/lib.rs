//! # Keymix Core
//!
//! Deterministic expansion of a large secret key (typically many MiB) into
//! an arbitrarily long keystream, and XOR-stream encryption on top of it.
//!
//! ## Algorithm
//!
//! The key is a sequence of macro-blocks, one block of the chosen mixing
//! primitive each, and the block count is a power of a small *fanout*
//! (2, 3 or 4). One **keymix** interleaves `1 + log_fanout(blocks)` mix
//! passes with *spread* permutations that trade mini-blocks across ever
//! larger spans, so every output byte depends on every input byte.
//!
//! Streams longer than one key re-run the keymix under fresh counters: each
//! working key is the secret key with the IV XORed onto its first 16 bytes
//! and a running 32-bit counter at bytes 16..20.
//!
//! ## Parallelism
//!
//! Two independent axes:
//!
//! - **Internal** threads split one keymix across the key's macro-blocks.
//!   Early levels run uncoordinated inside per-thread chunks; later levels
//!   synchronize around each cross-chunk spread. Output never depends on the
//!   thread count.
//! - **External** workers run distinct keymix invocations (distinct counter
//!   values) for different spans of the stream.
//!
//! ## Example
//!
//! ```rust
//! use keymix_core::{encrypt, keymix_stream, Ctx, Fanout, MixType};
//!
//! // A 9-block key for the 48-byte MixCTR primitive, fanout 3.
//! let key = vec![7u8; 48 * 9];
//!
//! // Raw keystream expansion.
//! let ctx = Ctx::expansion(MixType::AesNiMixCtr, &key, Fanout::Three).unwrap();
//! let mut keystream = vec![0u8; 1000];
//! keymix_stream(&ctx, &mut keystream, 1, 1, 0).unwrap();
//!
//! // XOR-stream encryption; a second pass recovers the plaintext.
//! let iv = *b"0123456789abcdef";
//! let ctx = Ctx::encryption(MixType::AesNiMixCtr, &key, Fanout::Three, iv).unwrap();
//! let plaintext = b"attack at dawn".to_vec();
//! let mut ciphertext = vec![0u8; plaintext.len()];
//! encrypt(&ctx, &plaintext, &mut ciphertext, 1, 1, 0).unwrap();
//!
//! let mut recovered = vec![0u8; ciphertext.len()];
//! encrypt(&ctx, &ciphertext, &mut recovered, 1, 1, 0).unwrap();
//! assert_eq!(recovered, plaintext);
//! ```

mod barrier;
mod ctx;
mod enc;
mod error;
mod keymix;
mod mix;
mod params;
mod spread;

pub use ctx::{Ctx, Fanout};
pub use enc::{encrypt, keymix_stream};
pub use error::{Error, Result};
pub use keymix::keymix;
pub use mix::MixType;
pub use params::{COUNTER_OFFSET, COUNTER_SIZE, IV_SIZE, MIN_COUNTER_KEY_SIZE};
