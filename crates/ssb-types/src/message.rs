//! The immutable, stored message value (spec §4.1) and its canonical
//! encoding (spec §6).
//!
//! Canonical JSON for signing is "the object with keys in insertion order,
//! two-space indentation, no trailing newline" (spec §6) — `serde_json`'s
//! pretty printer already indents with two spaces and never appends a
//! trailing newline, and with the `preserve_order` feature a
//! `serde_json::Map` keeps insertion order instead of sorting keys, so the
//! canonical form is just "build the `Map` in field order, then
//! `to_string_pretty`".

use serde_json::{Map, Value};

use crate::content::{Content, ContentError};
use crate::refs::{FeedRef, MessageRef, RefError};

/// An immutable, stored SSB message (spec §4.1).
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub key: MessageRef,
    pub previous: Option<MessageRef>,
    pub author: FeedRef,
    pub sequence: i64,
    pub timestamp: u64,
    pub content: Content,
    /// The content exactly as received, for re-encoding and indexing by
    /// content kinds this core doesn't interpret.
    pub raw_content: Value,
    /// Raw 64-byte Ed25519 signature.
    pub signature: [u8; 64],
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IngestError {
    #[error("malformed message JSON: {0}")]
    Json(String),
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("signature verification failed")]
    BadSignature,
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHash(String),
    #[error("sequence must be >= 1, got {0}")]
    NonPositiveSequence(i64),
    #[error("sequence {sequence} is inconsistent with previous={has_previous} (sequence == 1 iff previous is nil)")]
    SequenceInvariant { sequence: i64, has_previous: bool },
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl Message {
    /// Parse a wire-format message (spec §6), verify its signature under
    /// its claimed author, check the sequence/previous invariant, and
    /// compute its `key`. This is the boundary check spec §7 requires
    /// before a message may ever reach `append`.
    pub fn parse_and_verify(json: &[u8]) -> Result<Self, IngestError> {
        Self::parse(json, true)
    }

    /// Reconstruct a `Message` from canonical bytes already accepted by
    /// [`Message::parse_and_verify`] once (e.g. when reading a stored
    /// message back out of the receive-log). Skips signature verification
    /// — spec §7 only requires that check at the append boundary.
    pub fn decode_trusted(canonical_bytes: &[u8]) -> Result<Self, IngestError> {
        Self::parse(canonical_bytes, false)
    }

    fn parse(json: &[u8], verify_signature: bool) -> Result<Self, IngestError> {
        let value: Value =
            serde_json::from_slice(json).map_err(|e| IngestError::Json(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| IngestError::Json("message is not a JSON object".to_string()))?;

        let previous = match obj.get("previous") {
            Some(Value::Null) | None => None,
            Some(Value::String(s)) => Some(s.parse::<MessageRef>()?),
            Some(_) => {
                return Err(IngestError::Json("previous must be a string or null".into()))
            }
        };

        let author_str = obj
            .get("author")
            .and_then(Value::as_str)
            .ok_or(IngestError::MissingField("author"))?;
        let author: FeedRef = author_str.parse()?;

        let sequence = obj
            .get("sequence")
            .and_then(Value::as_i64)
            .ok_or(IngestError::MissingField("sequence"))?;
        if sequence < 1 {
            return Err(IngestError::NonPositiveSequence(sequence));
        }
        if (sequence == 1) != previous.is_none() {
            return Err(IngestError::SequenceInvariant {
                sequence,
                has_previous: previous.is_some(),
            });
        }

        let timestamp = obj
            .get("timestamp")
            .and_then(Value::as_u64)
            .ok_or(IngestError::MissingField("timestamp"))?;

        let hash_algo = obj
            .get("hash")
            .and_then(Value::as_str)
            .ok_or(IngestError::MissingField("hash"))?;
        if hash_algo != "sha256" {
            return Err(IngestError::UnsupportedHash(hash_algo.to_string()));
        }

        let content_value = obj
            .get("content")
            .cloned()
            .ok_or(IngestError::MissingField("content"))?;

        let signature_str = obj
            .get("signature")
            .and_then(Value::as_str)
            .ok_or(IngestError::MissingField("signature"))?;
        let signature = decode_signature(signature_str)?;

        if verify_signature {
            let unsigned = canonical_value(&previous, &author, sequence, timestamp, &content_value);
            let unsigned_bytes = to_canonical_bytes(&unsigned);
            let verifying_key = ssb_crypto::ed25519::VerifyingKey::from_bytes(&author.key)
                .map_err(|_| IngestError::BadSignature)?;
            let sig = ssb_crypto::ed25519::Signature::from_bytes(&signature);
            verifying_key
                .verify(&unsigned_bytes, &sig)
                .map_err(|_| IngestError::BadSignature)?;
        }

        let signed = canonical_value_signed(
            &previous,
            &author,
            sequence,
            timestamp,
            &content_value,
            signature_str,
        );
        let key = MessageRef::of_sha256(&to_canonical_bytes(&signed));

        let content = Content::from_json(&content_value)?;

        Ok(Message {
            key,
            previous,
            author,
            sequence,
            timestamp,
            content,
            raw_content: content_value,
            signature,
        })
    }

    /// Re-serialize this message to the canonical bytes used for hashing
    /// and storage. `decode_trusted(msg.to_canonical_bytes())` round-trips.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let sig_str = encode_signature(&self.signature);
        let signed = canonical_value_signed(
            &self.previous,
            &self.author,
            self.sequence,
            self.timestamp,
            &self.raw_content,
            &sig_str,
        );
        to_canonical_bytes(&signed)
    }
}

fn canonical_value(
    previous: &Option<MessageRef>,
    author: &FeedRef,
    sequence: i64,
    timestamp: u64,
    content: &Value,
) -> Value {
    let mut map = Map::new();
    map.insert(
        "previous".to_string(),
        previous
            .as_ref()
            .map(|p| Value::String(p.to_string()))
            .unwrap_or(Value::Null),
    );
    map.insert("author".to_string(), Value::String(author.to_string()));
    map.insert("sequence".to_string(), Value::from(sequence));
    map.insert("timestamp".to_string(), Value::from(timestamp));
    map.insert("hash".to_string(), Value::String("sha256".to_string()));
    map.insert("content".to_string(), content.clone());
    Value::Object(map)
}

fn canonical_value_signed(
    previous: &Option<MessageRef>,
    author: &FeedRef,
    sequence: i64,
    timestamp: u64,
    content: &Value,
    signature: &str,
) -> Value {
    let mut value = canonical_value(previous, author, sequence, timestamp, content);
    value
        .as_object_mut()
        .expect("canonical_value always returns an object")
        .insert("signature".to_string(), Value::String(signature.to_string()));
    value
}

fn to_canonical_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_string_pretty(value)
        .expect("canonical message values always serialize")
        .into_bytes()
}

fn decode_signature(s: &str) -> Result<[u8; 64], IngestError> {
    let b64_part = s
        .strip_suffix(".sig.ed25519")
        .ok_or_else(|| IngestError::Json(format!("malformed signature suffix: {s}")))?;
    let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, b64_part)
        .map_err(|e| IngestError::Json(format!("malformed signature base64: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| IngestError::Json("signature must be 64 bytes".to_string()))
}

fn encode_signature(sig: &[u8; 64]) -> String {
    format!(
        "{}.sig.ed25519",
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, sig)
    )
}
