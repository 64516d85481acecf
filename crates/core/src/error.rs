//! Library-wide error and result types.

use thiserror::Error;

use crate::params::MIN_COUNTER_KEY_SIZE;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the keymix core can produce.
///
/// Configuration problems are reported before any mixing starts; the
/// remaining variants surface from workers and are aggregated
/// first-failure-wins.
#[derive(Debug, Error)]
pub enum Error {
    /// The key length is not a whole number of primitive blocks.
    #[error("key of {size} bytes is not a multiple of the {block_size}-byte block")]
    KeyNotBlockAligned { size: usize, block_size: usize },

    /// The key's block count is not a power of the chosen fanout.
    #[error("key of {macros} blocks is not a power of fanout {fanout}")]
    KeyNotPowerOfFanout { macros: usize, fanout: u8 },

    /// The primitive's block cannot be split into `fanout` equal mini-blocks.
    #[error("block size {block_size} is not divisible by fanout {fanout}")]
    BlockNotDivisible { block_size: usize, fanout: u8 },

    /// The key is too small to host the IV window and the counter.
    #[error("key of {size} bytes cannot hold the {MIN_COUNTER_KEY_SIZE}-byte IV and counter window")]
    KeyTooShortForCounter { size: usize },

    /// No catalog entry is registered under the given name.
    #[error("unknown mix primitive `{0}`")]
    UnknownPrimitive(String),

    /// The fanout must be 2, 3 or 4.
    #[error("invalid fanout {0}, must be 2, 3 or 4")]
    InvalidFanout(u8),

    /// The operation needs a context built for encryption.
    #[error("operation requires an encryption context with the IV and counter enabled")]
    EncryptionContextRequired,

    /// The operation needs a context built for keystream expansion.
    #[error("operation requires an expansion context")]
    ExpansionContextRequired,

    /// Input and output buffers must have the same length.
    #[error("input is {input} bytes but output is {output}")]
    LengthMismatch { input: usize, output: usize },

    /// A keymix buffer does not match the context's key size.
    #[error("buffer of {size} bytes does not match the {key_size}-byte key")]
    BadKeymixSize { size: usize, key_size: usize },

    /// An underlying cryptographic call reported failure.
    #[error("mix primitive failed: {0}")]
    Primitive(&'static str),

    /// A worker thread died without reporting a result.
    #[error("worker thread panicked")]
    WorkerPanic,

    /// An underlying I/O operation failed (stream front-end only).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
