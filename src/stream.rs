//! Whole-stream front-end over the keymix engine.
//!
//! The key and the resource are materialized in memory: the engine needs the
//! key whole anyway, and keystream generation dominates I/O by orders of
//! magnitude.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use log::debug;
use zeroize::Zeroizing;

use keymix_core::{encrypt, keymix_stream, Ctx, Result};

/// Reads a key file whole. The buffer is wiped when dropped.
pub fn load_key(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    Ok(Zeroizing::new(fs::read(path)?))
}

/// Encrypts everything from `reader` onto `writer`.
///
/// The same call with the same context decrypts.
pub fn stream_encrypt(
    ctx: &Ctx,
    reader: &mut impl Read,
    writer: &mut impl Write,
    external_threads: usize,
    internal_threads: usize,
) -> Result<()> {
    let mut plaintext = Zeroizing::new(Vec::new());
    reader.read_to_end(&mut plaintext)?;
    debug!("encrypting {} bytes with a {}-byte key", plaintext.len(), ctx.key_size());

    let mut ciphertext = vec![0u8; plaintext.len()];
    encrypt(ctx, &plaintext, &mut ciphertext, external_threads, internal_threads, 0)?;

    writer.write_all(&ciphertext)?;
    Ok(())
}

/// Writes `size` bytes of raw keystream onto `writer`.
pub fn stream_expand(
    ctx: &Ctx,
    writer: &mut impl Write,
    size: usize,
    external_threads: usize,
    internal_threads: usize,
) -> Result<()> {
    let mut keystream = Zeroizing::new(vec![0u8; size]);
    keymix_stream(ctx, &mut keystream, external_threads, internal_threads, 0)?;
    writer.write_all(&keystream)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymix_core::{Fanout, MixType};
    use std::io::Cursor;

    fn test_ctx() -> Ctx {
        let key: Vec<u8> = (0..48 * 9).map(|i| (i * 5 + 1) as u8).collect();
        Ctx::encryption(MixType::AesNiMixCtr, &key, Fanout::Three, [0x42u8; 16]).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let ctx = test_ctx();
        let resource: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();

        let mut ciphertext = Vec::new();
        stream_encrypt(&ctx, &mut Cursor::new(resource.clone()), &mut ciphertext, 2, 1).unwrap();
        assert_eq!(ciphertext.len(), resource.len());
        assert_ne!(ciphertext, resource);

        let mut recovered = Vec::new();
        stream_encrypt(&ctx, &mut Cursor::new(ciphertext), &mut recovered, 1, 1).unwrap();
        assert_eq!(recovered, resource);
    }

    #[test]
    fn expansion_writes_the_requested_length() {
        let key: Vec<u8> = (0..48 * 9).map(|i| (i * 5 + 1) as u8).collect();
        let ctx = Ctx::expansion(MixType::AesNiMixCtr, &key, Fanout::Three).unwrap();

        let mut out = Vec::new();
        stream_expand(&ctx, &mut out, 777, 1, 1).unwrap();
        assert_eq!(out.len(), 777);
    }
}
