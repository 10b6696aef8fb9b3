//! Parsed message content (spec §4.1, design note on variant content kinds).
//!
//! Content is opaque bytes at the receive-log level; this module is the one
//! place that looks inside it, classifying each message's `content` object
//! by its `"type"` field. Only `Contact` is interpreted further — the
//! fields the graph builder needs — everything else keeps its raw JSON so a
//! future indexer can add a case without touching the message model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::refs::{FeedRef, RefError};

/// A parsed `content` object, tagged by its declared `type`.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Contact(ContactContent),
    Post(Value),
    About(Value),
    Vote(Value),
    /// A recognized-but-uninterpreted type, or content with no `type` field.
    Other(Value),
}

/// The fields of a `type: "contact"` message this core needs (spec §6).
///
/// `following`/`blocking` absent means "no change" for that edge dimension
/// — this is why both are `Option<bool>` rather than `bool`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactContent {
    pub contact: FeedRef,
    #[serde(default)]
    pub following: Option<bool>,
    #[serde(default)]
    pub blocking: Option<bool>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ContentError {
    #[error("content is not a JSON object")]
    NotAnObject,
    #[error("contact content: {0}")]
    BadContact(#[from] RefError),
    #[error("contact content missing required field: {0}")]
    MissingField(&'static str),
}

impl Content {
    /// Classify a raw `content` value by its `"type"` field.
    pub fn from_json(value: &Value) -> Result<Self, ContentError> {
        let Some(obj) = value.as_object() else {
            // Private/encrypted content is an opaque string, not an object;
            // callers that need to distinguish that case inspect `value`
            // directly before calling this, so here a non-object is just
            // "uninterpreted".
            return Ok(Content::Other(value.clone()));
        };

        match obj.get("type").and_then(Value::as_str) {
            Some("contact") => Ok(Content::Contact(parse_contact(value)?)),
            Some("post") => Ok(Content::Post(value.clone())),
            Some("about") => Ok(Content::About(value.clone())),
            Some("vote") => Ok(Content::Vote(value.clone())),
            _ => Ok(Content::Other(value.clone())),
        }
    }

    /// `true` if this content is a contact message.
    pub fn as_contact(&self) -> Option<&ContactContent> {
        match self {
            Content::Contact(c) => Some(c),
            _ => None,
        }
    }
}

fn parse_contact(value: &Value) -> Result<ContactContent, ContentError> {
    let obj = value.as_object().ok_or(ContentError::NotAnObject)?;
    let contact_str = obj
        .get("contact")
        .and_then(Value::as_str)
        .ok_or(ContentError::MissingField("contact"))?;
    let contact: FeedRef = contact_str.parse()?;
    let following = obj.get("following").and_then(Value::as_bool);
    let blocking = obj.get("blocking").and_then(Value::as_bool);
    Ok(ContactContent {
        contact,
        following,
        blocking,
    })
}
