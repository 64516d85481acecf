//! Immutable configuration for keymix operations.

use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::mix::MixType;
use crate::params::{exact_log, MIN_COUNTER_KEY_SIZE};

/// The diffusion fanout: how many mini-blocks each macro-block splits into.
///
/// The key's macro-block count must be a power of this value, and the
/// primitive's block size must be divisible by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Fanout {
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Fanout {
    /// Every legal fanout, largest first.
    pub const ALL: [Fanout; 3] = [Fanout::Four, Fanout::Three, Fanout::Two];

    pub fn as_usize(self) -> usize {
        self as usize
    }

    /// The fanouts usable with a given block size, largest first.
    pub fn for_block_size(block_size: usize) -> impl Iterator<Item = Fanout> {
        Self::ALL
            .into_iter()
            .filter(move |fanout| block_size % fanout.as_usize() == 0)
    }
}

impl TryFrom<u8> for Fanout {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            2 => Ok(Fanout::Two),
            3 => Ok(Fanout::Three),
            4 => Ok(Fanout::Four),
            other => Err(Error::InvalidFanout(other)),
        }
    }
}

/// Everything a keymix call shares between its workers.
///
/// A context is validated once at construction and never mutated during an
/// operation. It keeps a private copy of the key, wiped on drop; workers
/// derive their own working copies from it.
#[derive(Debug)]
pub struct Ctx {
    key: Vec<u8>,
    primitive: MixType,
    fanout: Fanout,
    levels: u32,
    iv: [u8; 16],
    encrypt_mode: bool,
    apply_iv_counter: bool,
}

impl Ctx {
    /// Builds a context for XOR-stream encryption: the IV and counter are
    /// applied to every working key and the keystream is folded into the
    /// plaintext.
    pub fn encryption(primitive: MixType, key: &[u8], fanout: Fanout, iv: [u8; 16]) -> Result<Ctx> {
        let mut ctx = Ctx::validated(primitive, key, fanout)?;
        ctx.encrypt_mode = true;
        ctx.enable_iv_counter(iv)?;
        Ok(ctx)
    }

    /// Builds a context for raw keystream expansion.
    pub fn expansion(primitive: MixType, key: &[u8], fanout: Fanout) -> Result<Ctx> {
        Ctx::validated(primitive, key, fanout)
    }

    fn validated(primitive: MixType, key: &[u8], fanout: Fanout) -> Result<Ctx> {
        let block_size = primitive.block_size();
        if block_size % fanout.as_usize() != 0 {
            return Err(Error::BlockNotDivisible { block_size, fanout: fanout as u8 });
        }
        if key.is_empty() || key.len() % block_size != 0 {
            return Err(Error::KeyNotBlockAligned { size: key.len(), block_size });
        }
        let macros = key.len() / block_size;
        let levels = exact_log(macros, fanout.as_usize())
            .ok_or(Error::KeyNotPowerOfFanout { macros, fanout: fanout as u8 })?
            + 1;

        Ok(Ctx {
            key: key.to_vec(),
            primitive,
            fanout,
            levels,
            iv: [0u8; 16],
            encrypt_mode: false,
            apply_iv_counter: false,
        })
    }

    /// Makes every working key receive the IV on its first 16 bytes and a
    /// running counter on the following 4.
    pub fn enable_iv_counter(&mut self, iv: [u8; 16]) -> Result<()> {
        if self.key.len() < MIN_COUNTER_KEY_SIZE {
            return Err(Error::KeyTooShortForCounter { size: self.key.len() });
        }
        self.apply_iv_counter = true;
        self.iv = iv;
        Ok(())
    }

    /// Reverts [`enable_iv_counter`](Self::enable_iv_counter).
    pub fn disable_iv_counter(&mut self) {
        self.apply_iv_counter = false;
        self.iv = [0u8; 16];
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn key_size(&self) -> usize {
        self.key.len()
    }

    pub fn block_size(&self) -> usize {
        self.primitive.block_size()
    }

    /// Macro-blocks in the key.
    pub fn macros(&self) -> usize {
        self.key.len() / self.block_size()
    }

    /// Total mix layers: `1 + log_fanout(macros)`.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    pub fn primitive(&self) -> MixType {
        self.primitive
    }

    pub fn fanout(&self) -> Fanout {
        self.fanout
    }

    pub fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub fn is_encrypt(&self) -> bool {
        self.encrypt_mode
    }

    pub fn applies_iv_counter(&self) -> bool {
        self.apply_iv_counter
    }
}

impl Drop for Ctx {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_conversions() {
        assert_eq!(Fanout::try_from(3).unwrap(), Fanout::Three);
        assert!(matches!(Fanout::try_from(5), Err(Error::InvalidFanout(5))));
    }

    #[test]
    fn fanouts_for_block_size_prefer_largest() {
        let for_48: Vec<Fanout> = Fanout::for_block_size(48).collect();
        assert_eq!(for_48, vec![Fanout::Four, Fanout::Three, Fanout::Two]);

        let for_32: Vec<Fanout> = Fanout::for_block_size(32).collect();
        assert_eq!(for_32, vec![Fanout::Four, Fanout::Two]);

        let for_160: Vec<Fanout> = Fanout::for_block_size(160).collect();
        assert_eq!(for_160, vec![Fanout::Four, Fanout::Two]);
    }

    #[test]
    fn key_shape_is_validated() {
        let primitive = MixType::AesNiMixCtr;

        // 9 macro-blocks of 48 bytes: fine with fanout 3.
        let key = vec![1u8; 48 * 9];
        let ctx = Ctx::expansion(primitive, &key, Fanout::Three).unwrap();
        assert_eq!(ctx.levels(), 3);
        assert_eq!(ctx.macros(), 9);

        // Not a multiple of the block size.
        let err = Ctx::expansion(primitive, &key[..100], Fanout::Three).unwrap_err();
        assert!(matches!(err, Error::KeyNotBlockAligned { .. }));

        // 9 blocks is not a power of 2.
        let err = Ctx::expansion(primitive, &key, Fanout::Two).unwrap_err();
        assert!(matches!(err, Error::KeyNotPowerOfFanout { .. }));

        // 160-byte blocks cannot be split three ways.
        let key = vec![1u8; 160 * 3];
        let err = Ctx::expansion(MixType::OpensslShake128, &key, Fanout::Three).unwrap_err();
        assert!(matches!(err, Error::BlockNotDivisible { .. }));
    }

    #[test]
    fn one_block_key_cannot_host_the_counter() {
        let key = vec![1u8; 16];
        let err = Ctx::encryption(MixType::OpensslAes128, &key, Fanout::Two, [0u8; 16]).unwrap_err();
        assert!(matches!(err, Error::KeyTooShortForCounter { .. }));

        // The same key is fine for plain expansion.
        let ctx = Ctx::expansion(MixType::OpensslAes128, &key, Fanout::Two).unwrap();
        assert_eq!(ctx.levels(), 1);
    }
}
