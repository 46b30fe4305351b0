//! Credential checks and bidder anonymization.
//!
//! Credentials are never stored in plaintext. The first successful HELLO
//! for a name pins the SHA-256 hash of its credential; later HELLOs for
//! that name must present the same credential. Nothing is persisted.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Hex characters of the name hash shown in `BID` broadcasts.
pub const BIDDER_TAG_LEN: usize = 8;

/// Remembers which credential hash each display name was first used with.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    /// name -> SHA-256 hex of the credential.
    hashes: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `credential` may be used for `name`.
    ///
    /// Names seen for the first time accept any credential.
    pub fn verify(&self, name: &str, credential: &str) -> bool {
        match self.hashes.get(name) {
            Some(expected) => *expected == hash_credential(credential),
            None => true,
        }
    }

    /// Pins the credential for `name` unless one is already pinned.
    pub fn remember(&mut self, name: &str, credential: &str) {
        self.hashes
            .entry(name.to_string())
            .or_insert_with(|| hash_credential(credential));
    }

    /// Returns whether a credential is pinned for `name`.
    pub fn is_known(&self, name: &str) -> bool {
        self.hashes.contains_key(name)
    }

    /// Returns the number of names with a pinned credential.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// Hashes a credential using SHA-256, returning a lowercase hex string.
pub fn hash_credential(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    hex::encode(hasher.finalize())
}

/// Anonymous tag for a bidder: the first 8 hex characters of SHA-256(name).
pub fn bidder_tag(name: &str) -> String {
    let mut tag = hash_credential(name);
    tag.truncate(BIDDER_TAG_LEN);
    tag
}
