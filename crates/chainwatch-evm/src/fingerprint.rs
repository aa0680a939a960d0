//! Signature-topic extraction.
//!
//! For raw logs, topics[0] IS the fingerprint; it is never recomputed.
//! Schema-side fingerprints come from `EventFingerprint::of_signature`.

use chainwatch_core::event::EventFingerprint;

/// Extract the fingerprint from a raw log's topics (topics[0]).
/// Returns `None` if topics is empty or the first topic is malformed.
pub fn from_topics(topics: &[String]) -> Option<EventFingerprint> {
    let first = topics.first()?;
    let hex = first.strip_prefix("0x").unwrap_or(first);
    if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(EventFingerprint::new(format!("0x{hex}")))
    } else {
        None
    }
}

/// Parse a topic into its 32-byte word.
pub fn topic_word(topic: &str) -> Result<[u8; 32], String> {
    let hex = topic.strip_prefix("0x").unwrap_or(topic);
    let bytes = hex::decode(hex).map_err(|e| format!("invalid topic hex: {e}"))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| format!("topic is {} bytes, expected 32", b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_topics_valid() {
        let topics = vec![
            "0xDDF252AD1BE2C89B69C2B068FC378DAA952BA7F163C4A11628F55A4DF523B3EF".to_string(),
        ];
        let fp = from_topics(&topics).unwrap();
        assert_eq!(
            fp,
            EventFingerprint::of_signature("Transfer(address,address,uint256)")
        );
    }

    #[test]
    fn from_topics_rejects_short_or_empty() {
        assert!(from_topics(&[]).is_none());
        assert!(from_topics(&["0x1234".to_string()]).is_none());
    }

    #[test]
    fn topic_word_length_checked() {
        assert!(topic_word(&format!("0x{}", "00".repeat(32))).is_ok());
        assert!(topic_word("0x00").is_err());
        assert!(topic_word("0xzz").is_err());
    }
}
