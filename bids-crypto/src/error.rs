//! Crypto error types.

use thiserror::Error;

/// Errors from key generation and the encrypt/sign operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("empty range: low bound is greater than high bound")]
    EmptyRange,

    #[error("key size too small: {bits} bits (min {min})")]
    KeySize { bits: u64, min: u64 },

    #[error("message does not fit in the modulus")]
    MessageTooLarge,

    /// Decryption or verification failed. Deliberately carries no detail.
    #[error("message rejected")]
    Rejected,

    #[error("malformed key material: {0}")]
    Malformed(String),
}
