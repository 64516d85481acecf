//! The mix primitive registry.
//!
//! A mix pass applies a fixed-block-size one-way (or keyed invertible)
//! function independently to every block of a buffer. The catalog below maps
//! each symbolic tag to its block size and block-wise pass; the engine never
//! looks inside a primitive.
//!
//! Several tags exist for compatibility with invocations written against the
//! C-library-backed builds (openssl-, wolfcrypt-, aes-ni- prefixes). Tags
//! that denote the same mathematical function share one implementation here,
//! so any of them can be used interchangeably on the same key. The two
//! Farfalle wide-block-cipher tags are backed by stand-in passes (see their
//! functions below) until a Rust implementation exists.
//!
//! Every pass works in place: a block is read into a stack buffer,
//! transformed, and written back, so aliasing input with output is always
//! safe.

use std::sync::OnceLock;

use aes::{Aes128, Aes256, Block};
use blake2::{Blake2b512, Blake2s256, Digest};
use cipher::{BlockEncrypt, KeyInit};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{
    Sha3_256, Sha3_512, Shake128, Shake256, TurboShake128, TurboShake128Core, TurboShake256,
    TurboShake256Core,
};
use xoodyak::{XoodyakCommon, XoodyakHash};

use crate::error::{Error, Result};

const BLOCK_SIZE_AES: usize = 16;
const BLOCK_SIZE_SHA3_256: usize = 32;
const BLOCK_SIZE_BLAKE2S: usize = 32;
const BLOCK_SIZE_BLAKE3: usize = 32;
const BLOCK_SIZE_MIXCTR: usize = 48;
const BLOCK_SIZE_XOODYAK: usize = 48;
const BLOCK_SIZE_SHA3_512: usize = 64;
const BLOCK_SIZE_BLAKE2B: usize = 64;
const BLOCK_SIZE_XOOFFF_WBC: usize = 48;
const BLOCK_SIZE_SHAKE256: usize = 128;
const BLOCK_SIZE_SHAKE128: usize = 160;
const BLOCK_SIZE_KANGAROOTWELVE: usize = 160;
const BLOCK_SIZE_KRAVETTE_WBC: usize = 192;

/// Fixed key/constant used by the unkeyed AES-based passes.
const AES_FIXED_KEY: &[u8; 16] = b"super-secure-key";

/// Domain separation byte for the TurboSHAKE passes.
const TURBOSHAKE_DOMAIN: u8 = 0x1f;

/// AES blocks encrypted per MixCTR macro-block.
const MIXCTR_BLOCKS: usize = 3;

/// A block-wise mix pass over a buffer whose length is a multiple of the
/// primitive's block size.
type MixFn = fn(&mut [u8]) -> Result<()>;

/// Identifies one entry of the mix catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MixType {
    OpensslAes128,
    OpensslDaviesMeyer,
    OpensslMatyasMeyerOseas,
    WolfcryptAes128,
    WolfcryptDaviesMeyer,
    WolfcryptMatyasMeyerOseas,
    OpensslSha3_256,
    OpensslBlake2s,
    WolfcryptSha3_256,
    WolfcryptBlake2s,
    Blake3,
    AesNiMixCtr,
    OpensslMixCtr,
    WolfcryptMixCtr,
    OpensslSha3_512,
    OpensslBlake2b,
    WolfcryptSha3_512,
    WolfcryptBlake2b,
    XkcpXoodyak,
    XkcpXoofffWbc,
    OpensslShake256,
    WolfcryptShake256,
    XkcpTurboShake256,
    OpensslShake128,
    WolfcryptShake128,
    XkcpTurboShake128,
    XkcpKangarooTwelve,
    XkcpKravetteWbc,
}

struct MixEntry {
    tag: MixType,
    name: &'static str,
    block_size: usize,
    mix: MixFn,
}

/// The full catalog, indexed by `MixType` discriminant.
static CATALOG: &[MixEntry] = &[
    MixEntry { tag: MixType::OpensslAes128, name: "openssl-aes-128", block_size: BLOCK_SIZE_AES, mix: aes128_ecb },
    MixEntry { tag: MixType::OpensslDaviesMeyer, name: "openssl-davies-meyer", block_size: BLOCK_SIZE_AES, mix: davies_meyer },
    MixEntry { tag: MixType::OpensslMatyasMeyerOseas, name: "openssl-matyas-meyer-oseas", block_size: BLOCK_SIZE_AES, mix: matyas_meyer_oseas },
    MixEntry { tag: MixType::WolfcryptAes128, name: "wolfcrypt-aes-128", block_size: BLOCK_SIZE_AES, mix: aes128_ecb },
    MixEntry { tag: MixType::WolfcryptDaviesMeyer, name: "wolfcrypt-davies-meyer", block_size: BLOCK_SIZE_AES, mix: davies_meyer },
    MixEntry { tag: MixType::WolfcryptMatyasMeyerOseas, name: "wolfcrypt-matyas-meyer-oseas", block_size: BLOCK_SIZE_AES, mix: matyas_meyer_oseas },
    MixEntry { tag: MixType::OpensslSha3_256, name: "openssl-sha3-256", block_size: BLOCK_SIZE_SHA3_256, mix: sha3_256 },
    MixEntry { tag: MixType::OpensslBlake2s, name: "openssl-blake2s", block_size: BLOCK_SIZE_BLAKE2S, mix: blake2s },
    MixEntry { tag: MixType::WolfcryptSha3_256, name: "wolfcrypt-sha3-256", block_size: BLOCK_SIZE_SHA3_256, mix: sha3_256 },
    MixEntry { tag: MixType::WolfcryptBlake2s, name: "wolfcrypt-blake2s", block_size: BLOCK_SIZE_BLAKE2S, mix: blake2s },
    MixEntry { tag: MixType::Blake3, name: "blake3-blake3", block_size: BLOCK_SIZE_BLAKE3, mix: blake3_pass },
    MixEntry { tag: MixType::AesNiMixCtr, name: "aes-ni-mixctr", block_size: BLOCK_SIZE_MIXCTR, mix: mixctr },
    MixEntry { tag: MixType::OpensslMixCtr, name: "openssl-mixctr", block_size: BLOCK_SIZE_MIXCTR, mix: mixctr },
    MixEntry { tag: MixType::WolfcryptMixCtr, name: "wolfcrypt-mixctr", block_size: BLOCK_SIZE_MIXCTR, mix: mixctr },
    MixEntry { tag: MixType::OpensslSha3_512, name: "openssl-sha3-512", block_size: BLOCK_SIZE_SHA3_512, mix: sha3_512 },
    MixEntry { tag: MixType::OpensslBlake2b, name: "openssl-blake2b", block_size: BLOCK_SIZE_BLAKE2B, mix: blake2b },
    MixEntry { tag: MixType::WolfcryptSha3_512, name: "wolfcrypt-sha3-512", block_size: BLOCK_SIZE_SHA3_512, mix: sha3_512 },
    MixEntry { tag: MixType::WolfcryptBlake2b, name: "wolfcrypt-blake2b", block_size: BLOCK_SIZE_BLAKE2B, mix: blake2b },
    MixEntry { tag: MixType::XkcpXoodyak, name: "xkcp-xoodyak", block_size: BLOCK_SIZE_XOODYAK, mix: xoodyak_pass },
    MixEntry { tag: MixType::XkcpXoofffWbc, name: "xkcp-xoofff-wbc", block_size: BLOCK_SIZE_XOOFFF_WBC, mix: xoofff_wbc },
    MixEntry { tag: MixType::OpensslShake256, name: "openssl-shake256", block_size: BLOCK_SIZE_SHAKE256, mix: shake256 },
    MixEntry { tag: MixType::WolfcryptShake256, name: "wolfcrypt-shake256", block_size: BLOCK_SIZE_SHAKE256, mix: shake256 },
    MixEntry { tag: MixType::XkcpTurboShake256, name: "xkcp-turboshake256", block_size: BLOCK_SIZE_SHAKE256, mix: turboshake256 },
    MixEntry { tag: MixType::OpensslShake128, name: "openssl-shake128", block_size: BLOCK_SIZE_SHAKE128, mix: shake128 },
    MixEntry { tag: MixType::WolfcryptShake128, name: "wolfcrypt-shake128", block_size: BLOCK_SIZE_SHAKE128, mix: shake128 },
    MixEntry { tag: MixType::XkcpTurboShake128, name: "xkcp-turboshake128", block_size: BLOCK_SIZE_SHAKE128, mix: turboshake128 },
    MixEntry { tag: MixType::XkcpKangarooTwelve, name: "xkcp-kangarootwelve", block_size: BLOCK_SIZE_KANGAROOTWELVE, mix: kangarootwelve },
    MixEntry { tag: MixType::XkcpKravetteWbc, name: "xkcp-kravette-wbc", block_size: BLOCK_SIZE_KRAVETTE_WBC, mix: kravette_wbc },
];

impl MixType {
    fn entry(self) -> &'static MixEntry {
        let entry = &CATALOG[self as usize];
        debug_assert_eq!(entry.tag, self);
        entry
    }

    /// The tag's name as accepted on the command line.
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// The primitive's block size in bytes.
    pub fn block_size(self) -> usize {
        self.entry().block_size
    }

    /// Applies one mix pass to `buf`, block by block, in place.
    ///
    /// `buf.len()` must be a multiple of [`block_size`](Self::block_size).
    pub fn mix(self, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len() % self.block_size(), 0);
        (self.entry().mix)(buf)
    }

    /// Looks a tag up by its catalog name.
    pub fn from_name(name: &str) -> Result<MixType> {
        CATALOG
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.tag)
            .ok_or_else(|| Error::UnknownPrimitive(name.to_string()))
    }

    /// Iterates the whole catalog, in order.
    pub fn all() -> impl Iterator<Item = MixType> {
        CATALOG.iter().map(|entry| entry.tag)
    }
}

// *** SYMMETRIC CIPHER PASSES ***

fn fixed_key_cipher() -> &'static Aes128 {
    static CIPHER: OnceLock<Aes128> = OnceLock::new();
    CIPHER.get_or_init(|| Aes128::new(&(*AES_FIXED_KEY).into()))
}

/// AES-128-ECB under the fixed key.
fn aes128_ecb(buf: &mut [u8]) -> Result<()> {
    let cipher = fixed_key_cipher();
    for block in buf.chunks_exact_mut(BLOCK_SIZE_AES) {
        cipher.encrypt_block(Block::from_mut_slice(block));
    }
    Ok(())
}

/// Davies-Meyer: the block keys AES, which encrypts a fixed constant;
/// the constant is folded back in to make the pass one-way.
fn davies_meyer(buf: &mut [u8]) -> Result<()> {
    for chunk in buf.chunks_exact_mut(BLOCK_SIZE_AES) {
        let cipher = Aes128::new_from_slice(chunk).map_err(|_| Error::Primitive("aes-128 key"))?;
        let mut block = Block::clone_from_slice(AES_FIXED_KEY);
        cipher.encrypt_block(&mut block);
        for (dst, (enc, c)) in chunk.iter_mut().zip(block.iter().zip(AES_FIXED_KEY)) {
            *dst = enc ^ c;
        }
    }
    Ok(())
}

/// Matyas-Meyer-Oseas: fixed-key AES of the block, XORed with the block.
fn matyas_meyer_oseas(buf: &mut [u8]) -> Result<()> {
    let cipher = fixed_key_cipher();
    for chunk in buf.chunks_exact_mut(BLOCK_SIZE_AES) {
        let mut block = Block::clone_from_slice(chunk);
        cipher.encrypt_block(&mut block);
        for (dst, enc) in chunk.iter_mut().zip(block) {
            *dst ^= enc;
        }
    }
    Ok(())
}

/// MixCTR: bytes 0..32 of each macro-block key AES-256, bytes 32..48 seed a
/// 128-bit little-endian counter; the macro-block is replaced with the
/// encryption of counter, counter+1, counter+2.
fn mixctr(buf: &mut [u8]) -> Result<()> {
    for macro_block in buf.chunks_exact_mut(BLOCK_SIZE_MIXCTR) {
        let cipher =
            Aes256::new_from_slice(&macro_block[..32]).map_err(|_| Error::Primitive("aes-256 key"))?;
        let counter = u128::from_le_bytes(macro_block[32..48].try_into().unwrap());

        let mut out = [0u8; BLOCK_SIZE_MIXCTR];
        for b in 0..MIXCTR_BLOCKS {
            let data = counter.wrapping_add(b as u128).to_le_bytes();
            let mut block = Block::clone_from_slice(&data);
            cipher.encrypt_block(&mut block);
            out[b * BLOCK_SIZE_AES..(b + 1) * BLOCK_SIZE_AES].copy_from_slice(&block);
        }
        macro_block.copy_from_slice(&out);
    }
    Ok(())
}

// *** HASH PASSES ***

fn sha3_256(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_SHA3_256) {
        let digest = Sha3_256::digest(&*block);
        block.copy_from_slice(&digest);
    }
    Ok(())
}

fn sha3_512(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_SHA3_512) {
        let digest = Sha3_512::digest(&*block);
        block.copy_from_slice(&digest);
    }
    Ok(())
}

fn blake2s(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_BLAKE2S) {
        let digest = Blake2s256::digest(&*block);
        block.copy_from_slice(&digest);
    }
    Ok(())
}

fn blake2b(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_BLAKE2B) {
        let digest = Blake2b512::digest(&*block);
        block.copy_from_slice(&digest);
    }
    Ok(())
}

fn blake3_pass(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_BLAKE3) {
        let digest = blake3::hash(block);
        block.copy_from_slice(digest.as_bytes());
    }
    Ok(())
}

// *** XOF PASSES ***
//
// For the extendable-output functions the block size is the largest amount
// that stays within one invocation of the underlying permutation.

fn xof_pass<X: Default + Update + ExtendableOutput>(block_size: usize, buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(block_size) {
        let mut xof = X::default();
        xof.update(block);
        let mut reader = xof.finalize_xof();
        reader.read(block);
    }
    Ok(())
}

fn shake128(buf: &mut [u8]) -> Result<()> {
    xof_pass::<Shake128>(BLOCK_SIZE_SHAKE128, buf)
}

fn shake256(buf: &mut [u8]) -> Result<()> {
    xof_pass::<Shake256>(BLOCK_SIZE_SHAKE256, buf)
}

fn turboshake128(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_SHAKE128) {
        let mut xof = TurboShake128::from_core(TurboShake128Core::new(TURBOSHAKE_DOMAIN));
        xof.update(block);
        let mut reader = xof.finalize_xof();
        reader.read(block);
    }
    Ok(())
}

fn turboshake256(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_SHAKE256) {
        let mut xof = TurboShake256::from_core(TurboShake256Core::new(TURBOSHAKE_DOMAIN));
        xof.update(block);
        let mut reader = xof.finalize_xof();
        reader.read(block);
    }
    Ok(())
}

fn kangarootwelve(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_KANGAROOTWELVE) {
        let mut xof = k12::KangarooTwelve::default();
        xof.update(block);
        let mut reader = xof.finalize_xof();
        reader.read(block);
    }
    Ok(())
}

fn xoodyak_pass(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_XOODYAK) {
        let mut state = XoodyakHash::new();
        state.absorb(block);
        state.squeeze(block);
    }
    Ok(())
}

// The Farfalle wide-block ciphers have no Rust implementation. These two
// tags keep their catalog slot and declared block size behind a stand-in
// hash pass over the same permutation family; output is NOT interoperable
// with the XKCP originals.

/// Placeholder for Xoofff-WBC (Xoodoo family).
fn xoofff_wbc(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_XOOFFF_WBC) {
        let mut state = XoodyakHash::new();
        state.absorb(block);
        state.squeeze(block);
    }
    Ok(())
}

/// Placeholder for Kravatte-WBC (Keccak-p[1600] family).
fn kravette_wbc(buf: &mut [u8]) -> Result<()> {
    for block in buf.chunks_exact_mut(BLOCK_SIZE_KRAVETTE_WBC) {
        let mut xof = TurboShake128::from_core(TurboShake128Core::new(TURBOSHAKE_DOMAIN));
        xof.update(block);
        let mut reader = xof.finalize_xof();
        reader.read(block);
    }
    Ok(())
}
