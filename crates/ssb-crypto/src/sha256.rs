//! SHA-256 hashing for message references.
//!
//! The reference protocol hashes the canonical encoding of a message with
//! SHA-256 to derive its [`MessageRef`](https://docs.rs/ssb-types) key; this
//! module is the one place in the workspace that touches the `sha2` crate.

use sha2::{Digest, Sha256};

/// Hash `data` and return the 32-byte digest.
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
