//! # ssb-crypto
//!
//! Cryptographic primitives used by the storage/indexing/trust-graph core:
//! Ed25519 signing and verification of feed messages, and SHA-256 hashing
//! for deriving message references.
//!
//! ## Modules
//!
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032)
//! - [`sha256`] — SHA-256 hashing for message references

pub mod ed25519;
pub mod sha256;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid input data (wrong length, non-canonical encoding, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
