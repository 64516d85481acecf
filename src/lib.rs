//! Keymixer
//!
//! Stream encryption built on the keymix engine: a large secret key is
//! deterministically expanded into a keystream as long as the resource, and
//! the two are XORed together. The same invocation decrypts.
//!
//! # Overview
//!
//! - The key lives in a plain file of raw bytes; its block count must be a
//!   power of the diffusion fanout (see [`algorithm`] for the shape rules).
//! - Every run derives per-worker working keys from the key, the 16-byte IV
//!   and a 32-bit counter, so a stream of any length never reuses a keymix
//!   input.
//! - Mixing primitives are chosen by catalog name
//!   ([`MixType::from_name`]), from AES-based constructions to SHA-3,
//!   BLAKE2/3 and the Keccak-family XOFs.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use keymixer::{stream, Ctx, Fanout, MixType};
//!
//! let key = vec![9u8; 48 * 27];
//! let ctx = Ctx::encryption(MixType::AesNiMixCtr, &key, Fanout::Three, [0u8; 16]).unwrap();
//!
//! let mut input = Cursor::new(b"some resource".to_vec());
//! let mut output = Vec::new();
//! stream::stream_encrypt(&ctx, &mut input, &mut output, 2, 1).unwrap();
//! assert_eq!(output.len(), 13);
//! ```

// Re-export the core algorithm
pub use keymix_core as algorithm;

pub mod stream;

// Convenience re-exports
pub use algorithm::{encrypt, keymix, keymix_stream, Ctx, Error, Fanout, MixType, Result};
