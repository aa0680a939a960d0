//! In-memory `SchemaRegistry` implementation.
//!
//! Built once from a schema document and never mutated afterwards, so it
//! can be shared behind an `Arc` without locking.

use chainwatch_core::{
    error::SchemaError,
    event::EventFingerprint,
    schema::{EventSchema, SchemaRegistry},
};
use std::{collections::HashMap, path::Path};
use tracing::info;

use crate::abi::AbiParser;

/// Immutable schema registry indexed by fingerprint and by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    /// Schemas in document order
    schemas: Vec<EventSchema>,
    /// Fingerprint hex → index into `schemas`
    by_fingerprint: HashMap<String, usize>,
    /// Event name → index into `schemas`
    by_name: HashMap<String, usize>,
}

impl MemoryRegistry {
    /// Build a registry from already-parsed schemas.
    pub fn from_schemas(schemas: Vec<EventSchema>) -> Result<Self, SchemaError> {
        let mut by_fingerprint = HashMap::with_capacity(schemas.len());
        let mut by_name = HashMap::with_capacity(schemas.len());

        for (idx, schema) in schemas.iter().enumerate() {
            for field in schema.params() {
                field.ty.validate().map_err(|reason| SchemaError::InvalidType {
                    event: schema.name.clone(),
                    param: field.name.clone(),
                    ty: field.ty.to_string(),
                    reason,
                })?;
            }
            if by_name.insert(schema.name.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateEvent {
                    name: schema.name.clone(),
                });
            }
            // Anonymous events never carry their signature in topics[0].
            if !schema.anonymous {
                by_fingerprint.insert(schema.fingerprint.as_hex().to_string(), idx);
            }
        }

        Ok(Self {
            schemas,
            by_fingerprint,
            by_name,
        })
    }

    /// Parse a JSON ABI document.
    pub fn load_json(json: &str) -> Result<Self, SchemaError> {
        Self::from_schemas(AbiParser::parse_json(json)?)
    }

    /// Parse a YAML ABI document.
    pub fn load_yaml(yaml: &str) -> Result<Self, SchemaError> {
        Self::from_schemas(AbiParser::parse_yaml(yaml)?)
    }

    /// Load an ABI document from disk. `.yaml` / `.yml` files are parsed as
    /// YAML, anything else as JSON.
    pub fn load_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false);
        let registry = if is_yaml {
            Self::load_yaml(&content)?
        } else {
            Self::load_json(&content)?
        };
        info!(
            "loaded {} event schemas from {}",
            registry.schemas.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Returns all event names in document order.
    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }
}

impl SchemaRegistry for MemoryRegistry {
    fn lookup(&self, fp: &EventFingerprint) -> Option<&EventSchema> {
        self.by_fingerprint
            .get(fp.as_hex())
            .map(|&idx| &self.schemas[idx])
    }

    fn get_by_name(&self, name: &str) -> Option<&EventSchema> {
        self.by_name.get(name).map(|&idx| &self.schemas[idx])
    }

    fn schemas(&self) -> Vec<&EventSchema> {
        self.schemas.iter().collect()
    }

    fn len(&self) -> usize {
        self.schemas.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_core::types::CanonicalType;

    const ABI: &str = r#"[
      {"type":"event","name":"TokenMinted","anonymous":false,"inputs":[
        {"indexed":true,"name":"tokenId","type":"uint256"},
        {"indexed":true,"name":"owner","type":"address"},
        {"indexed":false,"name":"tokenURI","type":"string"}]},
      {"type":"event","name":"TokenSold","anonymous":false,"inputs":[
        {"indexed":true,"name":"tokenId","type":"uint256"},
        {"indexed":true,"name":"buyer","type":"address"},
        {"indexed":false,"name":"price","type":"uint256"}]},
      {"type":"event","name":"Hidden","anonymous":true,"inputs":[
        {"indexed":true,"name":"who","type":"address"}]}
    ]"#;

    #[test]
    fn lookup_every_known_fingerprint() {
        let reg = MemoryRegistry::load_json(ABI).unwrap();
        for schema in reg.schemas().into_iter().filter(|s| !s.anonymous) {
            let found = reg.lookup(&schema.fingerprint).expect("schema not indexed");
            assert_eq!(found, schema);
        }
    }

    #[test]
    fn lookup_unknown_fingerprint_is_none() {
        let reg = MemoryRegistry::load_json(ABI).unwrap();
        let transfer = EventFingerprint::of_signature("Transfer(address,address,uint256)");
        assert!(reg.lookup(&transfer).is_none());
        assert!(reg.lookup(&EventFingerprint::new("0x")).is_none());
    }

    #[test]
    fn anonymous_events_are_not_indexed_by_fingerprint() {
        let reg = MemoryRegistry::load_json(ABI).unwrap();
        let hidden = reg.get_by_name("Hidden").unwrap();
        assert!(reg.lookup(&hidden.fingerprint).is_none());
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn lookup_by_name_and_order() {
        let reg = MemoryRegistry::load_json(ABI).unwrap();
        assert_eq!(reg.names(), ["TokenMinted", "TokenSold", "Hidden"]);
        assert_eq!(
            reg.get_by_name("TokenSold").unwrap().signature,
            "TokenSold(uint256,address,uint256)"
        );
        assert!(reg.get_by_name("TokenBurned").is_none());
    }

    #[test]
    fn duplicate_schemas_rejected() {
        let mut schemas = AbiParser::parse_json(ABI).unwrap();
        schemas.push(schemas[0].clone());
        let err = MemoryRegistry::from_schemas(schemas).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateEvent { .. }));
    }

    #[test]
    fn hand_built_schemas_with_bad_widths_rejected() {
        for bad in [CanonicalType::FixedBytes(33), CanonicalType::Int(0)] {
            let mut schemas = AbiParser::parse_json(ABI).unwrap();
            schemas[1].data[0].ty = bad.clone();
            let err = MemoryRegistry::from_schemas(schemas).unwrap_err();
            assert!(
                matches!(
                    err,
                    SchemaError::InvalidType { ref event, ref param, .. }
                        if event == "TokenSold" && param == "price"
                ),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn load_file_reports_missing_path() {
        let err = MemoryRegistry::load_file(Path::new("/nonexistent/abi.json")).unwrap_err();
        assert!(matches!(err, SchemaError::Io(_)));
    }
}
