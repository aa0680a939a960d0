//! Raw and decoded log types.

use crate::error::DecodeError;
use crate::types::NormalizedValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

/// A raw, undecoded log record as delivered by the network layer.
/// This is the input to the decoder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLog {
    /// Contract address that emitted the log
    pub address: String,
    /// topics[0] is the event signature hash; topics[1..] are indexed params.
    /// Each topic is 0x-prefixed hex of 32 bytes.
    pub topics: Vec<String>,
    /// ABI-encoded non-indexed parameters
    pub data: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
}

impl RawLog {
    /// Returns topics[0], the event signature hash, if present.
    pub fn signature(&self) -> Option<&str> {
        self.topics.first().map(|s| s.as_str())
    }
}

/// keccak256 of an event's canonical signature, 0x-prefixed lowercase hex.
/// Used for O(1) schema lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct EventFingerprint(String);

impl From<String> for EventFingerprint {
    fn from(hex: String) -> Self {
        Self::new(hex)
    }
}

impl EventFingerprint {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    /// Compute the fingerprint of a canonical signature such as
    /// `"TokenSold(uint256,address,uint256)"`.
    pub fn of_signature(signature: &str) -> Self {
        let mut hasher = Keccak::v256();
        let mut output = [0u8; 32];
        hasher.update(signature.as_bytes());
        hasher.finalize(&mut output);
        Self(format!("0x{}", hex::encode(output)))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded log. Fields are kept in the event's declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedLog {
    /// Event name, e.g. "TokenMinted"
    pub event: String,
    pub fingerprint: EventFingerprint,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub fields: IndexMap<String, NormalizedValue>,
}

impl DecodedLog {
    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&NormalizedValue> {
        self.fields.get(name)
    }

    /// Get a field value by name, or a `MissingField` error.
    pub fn require(&self, name: &str) -> Result<&NormalizedValue, DecodeError> {
        self.fields.get(name).ok_or_else(|| DecodeError::MissingField {
            event: self.event.clone(),
            field: name.to_string(),
        })
    }
}

impl fmt::Display for DecodedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        write!(f, "{}: {}", self.event, parts.join(", "))
    }
}

/// Projection of a generic [`DecodedLog`] into a consumer's event type.
///
/// `Ok(None)` means the log is valid but not modelled by `Self`; the
/// dispatcher treats it like an unrecognized signature.
pub trait FromLog: Sized {
    /// Projection settings, held by the dispatcher and passed on every call.
    type Options: Default + Clone + Send + Sync + 'static;

    fn from_log(log: DecodedLog, options: &Self::Options) -> Result<Option<Self>, DecodeError>;
}

impl FromLog for DecodedLog {
    type Options = ();

    fn from_log(log: DecodedLog, _options: &()) -> Result<Option<Self>, DecodeError> {
        Ok(Some(log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_fingerprint() {
        let fp = EventFingerprint::of_signature("Transfer(address,address,uint256)");
        assert_eq!(
            fp.as_hex(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn fingerprint_is_case_insensitive() {
        let a = EventFingerprint::new("0xDDF252AD1BE2C89B69C2B068FC378DAA952BA7F163C4A11628F55A4DF523B3EF");
        let b = EventFingerprint::of_signature("Transfer(address,address,uint256)");
        assert_eq!(a, b);
    }

    #[test]
    fn deserialized_fingerprint_is_lowercased() {
        let fp: EventFingerprint = serde_json::from_str(
            r#""0xDDF252AD1BE2C89B69C2B068FC378DAA952BA7F163C4A11628F55A4DF523B3EF""#,
        )
        .unwrap();
        assert_eq!(
            fp,
            EventFingerprint::of_signature("Transfer(address,address,uint256)")
        );
        assert_eq!(serde_json::to_string(&fp).unwrap(), format!("\"{}\"", fp.as_hex()));
    }

    #[test]
    fn raw_log_signature() {
        let raw = RawLog {
            topics: vec!["0xabc".into(), "0xdef".into()],
            ..Default::default()
        };
        assert_eq!(raw.signature(), Some("0xabc"));
        assert_eq!(RawLog::default().signature(), None);
    }

    #[test]
    fn decoded_log_display_keeps_order() {
        let mut fields = IndexMap::new();
        fields.insert("tokenId".to_string(), NormalizedValue::Uint(7));
        fields.insert("tokenURI".to_string(), NormalizedValue::Str("a".into()));
        let log = DecodedLog {
            event: "TokenMinted".into(),
            fingerprint: EventFingerprint::new("0x01"),
            address: "0x0".into(),
            block_number: None,
            tx_hash: None,
            fields,
        };
        assert_eq!(log.to_string(), "TokenMinted: tokenId=7, tokenURI=a");
        assert!(log.require("owner").is_err());
    }
}
