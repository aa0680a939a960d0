//! Event schema types: the in-memory representation of a parsed event ABI.

use crate::event::EventFingerprint;
use crate::types::CanonicalType;
use serde::{Deserialize, Serialize};

/// A single named event parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: CanonicalType,
    /// Position of this parameter in the event declaration
    pub position: usize,
}

/// A parsed, validated event definition. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchema {
    /// Event name, unique within a registry, e.g. "TokenSold"
    pub name: String,
    /// Canonical signature, e.g. "TokenSold(uint256,address,uint256)"
    pub signature: String,
    /// keccak256 of `signature`; topics[0] of every matching log
    pub fingerprint: EventFingerprint,
    /// Indexed parameters (topics[1..]), in declaration order
    pub indexed: Vec<FieldDef>,
    /// Non-indexed parameters (data payload), in declaration order
    pub data: Vec<FieldDef>,
    /// Anonymous events carry no signature topic
    #[serde(default)]
    pub anonymous: bool,
}

impl EventSchema {
    /// All parameters in their original declaration order.
    pub fn params(&self) -> Vec<&FieldDef> {
        let mut all: Vec<&FieldDef> = self.indexed.iter().chain(self.data.iter()).collect();
        all.sort_by_key(|f| f.position);
        all
    }
}

/// A read-only view of a schema registry.
/// Concrete implementations live in `chainwatch-registry`.
pub trait SchemaRegistry: Send + Sync {
    /// Look up a schema by its signature hash.
    fn lookup(&self, fp: &EventFingerprint) -> Option<&EventSchema>;

    /// Look up a schema by event name.
    fn get_by_name(&self, name: &str) -> Option<&EventSchema>;

    /// All schemas, in document order.
    fn schemas(&self) -> Vec<&EventSchema>;

    fn len(&self) -> usize {
        self.schemas().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_restore_declaration_order() {
        let field = |name: &str, ty, position| FieldDef {
            name: name.into(),
            ty,
            position,
        };
        let schema = EventSchema {
            name: "TokenListedForSale".into(),
            signature: "TokenListedForSale(uint256,uint256,address)".into(),
            fingerprint: EventFingerprint::of_signature("TokenListedForSale(uint256,uint256,address)"),
            indexed: vec![
                field("tokenId", CanonicalType::Uint(256), 0),
                field("seller", CanonicalType::Address, 2),
            ],
            data: vec![field("price", CanonicalType::Uint(256), 1)],
            anonymous: false,
        };
        let names: Vec<_> = schema.params().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["tokenId", "price", "seller"]);
    }
}
