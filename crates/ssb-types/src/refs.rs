//! Typed feed and message references (spec §4.1).
//!
//! A [`FeedRef`] identifies a feed (an append-only sequence of messages
//! signed by one key) and a [`MessageRef`] identifies a single message. Both
//! have two canonical forms: a *sigil* string used at UI/RPC boundaries
//! (`@base64.ed25519`, `%base64.sha256`) and a *storage* form — a
//! length-prefixed binary tuple stable under byte comparison — used as the
//! feeds multi-log's sub-log address.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors converting between sigil, storage, and in-memory reference forms.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RefError {
    #[error("malformed reference: {0}")]
    Malformed(String),
}

/// Algorithm tag for a [`FeedRef`]. Only Ed25519 feeds are supported; the
/// tag is still explicit so a second algorithm can be added without
/// changing the storage-form layout of existing refs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedAlgo {
    Ed25519,
}

impl FeedAlgo {
    const fn tag_byte(self) -> u8 {
        match self {
            FeedAlgo::Ed25519 => 0,
        }
    }

    fn from_tag_byte(b: u8) -> Result<Self, RefError> {
        match b {
            0 => Ok(FeedAlgo::Ed25519),
            other => Err(RefError::Malformed(format!("unknown feed algo tag {other}"))),
        }
    }

    const fn sigil_suffix(self) -> &'static str {
        match self {
            FeedAlgo::Ed25519 => ".ed25519",
        }
    }
}

/// Algorithm tag for a [`MessageRef`]. Only SHA-256 is supported, matching
/// the `"hash": "sha256"` field of the message JSON (spec §6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageAlgo {
    Sha256,
}

impl MessageAlgo {
    const fn tag_byte(self) -> u8 {
        match self {
            MessageAlgo::Sha256 => 0,
        }
    }

    fn from_tag_byte(b: u8) -> Result<Self, RefError> {
        match b {
            0 => Ok(MessageAlgo::Sha256),
            other => Err(RefError::Malformed(format!(
                "unknown message algo tag {other}"
            ))),
        }
    }

    const fn sigil_suffix(self) -> &'static str {
        match self {
            MessageAlgo::Sha256 => ".sha256",
        }
    }
}

/// A reference to a feed: an algorithm tag plus a 32-byte public key.
///
/// Serializes/deserializes as its sigil string (`@base64.ed25519`), matching
/// how refs appear at the JSON/RPC boundary (spec §6).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedRef {
    pub algo: FeedAlgo,
    pub key: [u8; 32],
}

/// A reference to a single stored message: an algorithm tag plus a 32-byte
/// content hash. Serializes as its sigil string (`%base64.sha256`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub algo: MessageAlgo,
    pub hash: [u8; 32],
}

fn b64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn b64_decode(s: &str) -> Result<Vec<u8>, RefError> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| RefError::Malformed(e.to_string()))
}

impl FeedRef {
    pub fn new(algo: FeedAlgo, key: [u8; 32]) -> Self {
        Self { algo, key }
    }

    /// Length-prefixed-by-convention binary tuple: `algo_tag_byte || key`.
    /// Stable under byte comparison and used as the feeds multi-log address.
    pub fn to_storage(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33);
        out.push(self.algo.tag_byte());
        out.extend_from_slice(&self.key);
        out
    }

    pub fn from_storage(bytes: &[u8]) -> Result<Self, RefError> {
        if bytes.len() != 33 {
            return Err(RefError::Malformed(format!(
                "feed storage form must be 33 bytes, got {}",
                bytes.len()
            )));
        }
        let algo = FeedAlgo::from_tag_byte(bytes[0])?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[1..33]);
        Ok(Self { algo, key })
    }
}

impl MessageRef {
    pub fn new(algo: MessageAlgo, hash: [u8; 32]) -> Self {
        Self { algo, hash }
    }

    pub fn to_storage(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33);
        out.push(self.algo.tag_byte());
        out.extend_from_slice(&self.hash);
        out
    }

    pub fn from_storage(bytes: &[u8]) -> Result<Self, RefError> {
        if bytes.len() != 33 {
            return Err(RefError::Malformed(format!(
                "message storage form must be 33 bytes, got {}",
                bytes.len()
            )));
        }
        let algo = MessageAlgo::from_tag_byte(bytes[0])?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[1..33]);
        Ok(Self { algo, hash })
    }

    /// The `MessageRef` for the SHA-256 of `canonical_bytes`.
    pub fn of_sha256(canonical_bytes: &[u8]) -> Self {
        Self {
            algo: MessageAlgo::Sha256,
            hash: ssb_crypto::sha256::hash(canonical_bytes),
        }
    }
}

impl fmt::Display for FeedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}{}", b64_encode(&self.key), self.algo.sigil_suffix())
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}{}", b64_encode(&self.hash), self.algo.sigil_suffix())
    }
}

impl fmt::Debug for FeedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedRef({self})")
    }
}

impl fmt::Debug for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageRef({self})")
    }
}

impl FromStr for FeedRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('@')
            .ok_or_else(|| RefError::Malformed(format!("feed sigil must start with '@': {s}")))?;
        let (b64_part, suffix) = rest
            .split_once('.')
            .ok_or_else(|| RefError::Malformed(format!("feed sigil missing algo suffix: {s}")))?;
        let algo = match suffix {
            "ed25519" => FeedAlgo::Ed25519,
            other => {
                return Err(RefError::Malformed(format!(
                    "unknown feed sigil algo: {other}"
                )))
            }
        };
        let key_bytes = b64_decode(b64_part)?;
        let key: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| RefError::Malformed(format!("feed key must be 32 bytes: {s}")))?;
        Ok(Self { algo, key })
    }
}

impl FromStr for MessageRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('%').ok_or_else(|| {
            RefError::Malformed(format!("message sigil must start with '%': {s}"))
        })?;
        let (b64_part, suffix) = rest.split_once('.').ok_or_else(|| {
            RefError::Malformed(format!("message sigil missing algo suffix: {s}"))
        })?;
        let algo = match suffix {
            "sha256" => MessageAlgo::Sha256,
            other => {
                return Err(RefError::Malformed(format!(
                    "unknown message sigil algo: {other}"
                )))
            }
        };
        let hash_bytes = b64_decode(b64_part)?;
        let hash: [u8; 32] = hash_bytes
            .try_into()
            .map_err(|_| RefError::Malformed(format!("message hash must be 32 bytes: {s}")))?;
        Ok(Self { algo, hash })
    }
}

impl Serialize for FeedRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FeedRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for MessageRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
