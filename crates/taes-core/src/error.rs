//! Error type shared by every operation in the crate.

use thiserror::Error;

/// Result alias used throughout `taes-core`.
pub type Result<T> = core::result::Result<T, Error>;

/// Failures reported by the cipher core. None of them are retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid key size, key length or tweak length.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single-block operation received something other than 16 bytes.
    #[error("block must be exactly 16 bytes, got {actual}")]
    InvalidBlockSize {
        /// Length that was supplied.
        actual: usize,
    },

    /// The hardware backend was requested on a CPU without AES instructions.
    #[error("CPU does not support the AES instruction set")]
    HardwareUnsupported,

    /// A message shorter than one block cannot be processed with ciphertext stealing.
    #[error("ciphertext stealing needs at least 16 bytes of input, got {actual}")]
    InsufficientInput {
        /// Total message length that was supplied.
        actual: usize,
    },
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
