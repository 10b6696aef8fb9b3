//! Address functions for the core's four named multi-logs (spec §4.3):
//! each maps a message to the sub-log address(es) it belongs to, or no
//! addresses at all when the message doesn't belong in that index.

use ssb_types::{Content, Message};

use crate::AddrFn;

/// `feeds`: addr = the author's `FeedRef` storage form. Every message
/// belongs to exactly one feed sub-log.
pub fn feeds_addr() -> AddrFn {
    std::sync::Arc::new(|msg: &Message| vec![msg.author.to_storage()])
}

/// `byType`: addr = the raw `content.type` string, whatever an author
/// chooses to put there. Messages with no `type` field (or non-object
/// content) aren't indexed here.
pub fn by_type_addr() -> AddrFn {
    std::sync::Arc::new(|msg: &Message| {
        msg.raw_content
            .as_object()
            .and_then(|obj| obj.get("type"))
            .and_then(|v| v.as_str())
            .map(|t| vec![t.as_bytes().to_vec()])
            .unwrap_or_default()
    })
}

/// `byContent`: addr = this core's own content-kind classification
/// (`contact`, `post`, `about`, `vote`, `other`), independent of whatever
/// string an author put in `type`.
pub fn by_content_addr() -> AddrFn {
    std::sync::Arc::new(|msg: &Message| {
        let kind = match &msg.content {
            Content::Contact(_) => "contact",
            Content::Post(_) => "post",
            Content::About(_) => "about",
            Content::Vote(_) => "vote",
            Content::Other(_) => "other",
        };
        vec![kind.as_bytes().to_vec()]
    })
}

/// `private`: addr = the author's `FeedRef` storage form, for messages
/// whose content is opaque ciphertext (a JSON string, not an object) we
/// cannot interpret further without the decryption pipeline this core
/// doesn't own.
pub fn private_addr() -> AddrFn {
    std::sync::Arc::new(|msg: &Message| {
        if msg.raw_content.is_string() {
            vec![msg.author.to_storage()]
        } else {
            Vec::new()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssb_crypto::ed25519::KeyPair;
    use ssb_types::{FeedAlgo, FeedRef};

    fn signed(kp: &KeyPair, content: serde_json::Value) -> Message {
        let author = FeedRef::new(FeedAlgo::Ed25519, kp.verifying_key.to_bytes());
        let mut map = serde_json::Map::new();
        map.insert("previous".into(), serde_json::Value::Null);
        map.insert("author".into(), serde_json::Value::String(author.to_string()));
        map.insert("sequence".into(), serde_json::Value::from(1));
        map.insert("timestamp".into(), serde_json::Value::from(1000u64));
        map.insert("hash".into(), serde_json::Value::String("sha256".into()));
        map.insert("content".into(), content);
        let unsigned = serde_json::to_string_pretty(&serde_json::Value::Object(map.clone()))
            .unwrap()
            .into_bytes();
        let sig = kp.signing_key.sign(&unsigned);
        map.insert(
            "signature".into(),
            serde_json::Value::String(format!(
                "{}.sig.ed25519",
                base64::Engine::encode(&base64::engine::general_purpose::STANDARD, sig.to_bytes())
            )),
        );
        let json = serde_json::to_vec(&serde_json::Value::Object(map)).unwrap();
        Message::parse_and_verify(&json).expect("valid")
    }

    #[test]
    fn test_feeds_addr_is_author_storage() {
        let kp = KeyPair::generate();
        let msg = signed(&kp, serde_json::json!({ "type": "post", "text": "hi" }));
        let addrs = feeds_addr()(&msg);
        assert_eq!(addrs, vec![msg.author.to_storage()]);
    }

    #[test]
    fn test_by_type_addr_reads_raw_type_string() {
        let kp = KeyPair::generate();
        let msg = signed(&kp, serde_json::json!({ "type": "weird", "x": 1 }));
        assert_eq!(by_type_addr()(&msg), vec![b"weird".to_vec()]);
    }

    #[test]
    fn test_by_content_addr_classifies_contact() {
        let kp = KeyPair::generate();
        let other = FeedRef::new(FeedAlgo::Ed25519, [9u8; 32]);
        let msg = signed(
            &kp,
            serde_json::json!({ "type": "contact", "contact": other.to_string(), "following": true }),
        );
        assert_eq!(by_content_addr()(&msg), vec![b"contact".to_vec()]);
    }

    #[test]
    fn test_private_addr_only_matches_string_content() {
        let kp = KeyPair::generate();
        let cipher_msg = signed(&kp, serde_json::Value::String("base64ciphertext.box".into()));
        assert_eq!(private_addr()(&cipher_msg), vec![cipher_msg.author.to_storage()]);

        let post_msg = signed(&kp, serde_json::json!({ "type": "post", "text": "hi" }));
        assert!(private_addr()(&post_msg).is_empty());
    }
}
