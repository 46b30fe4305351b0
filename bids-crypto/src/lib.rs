//! # bids-crypto
//!
//! Self-contained public-key primitive used to authenticate and protect
//! peer traffic.
//!
//! This crate provides:
//! - Miller-Rabin probabilistic primality testing
//! - Uniform random primes within a range
//! - RSA keypair generation, textbook encryption and decryption
//! - SHA-256 based signing and verification
//!
//! The scheme is unpadded RSA. It is meant for this system's handshake and
//! signature use only, not as a general purpose cryptographic API.

pub mod error;
pub mod prime;
pub mod rsa;

pub use error::CryptoError;
pub use prime::{is_probably_prime, random_prime};
pub use rsa::{Keypair, PublicKey, SealedMessage};

/// Re-exported so callers can build and inspect key material.
pub use num_bigint::BigUint;
