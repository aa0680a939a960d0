//! Contract ABI document parser.
//!
//! Converts a standard Ethereum ABI document into `EventSchema` values.
//! Only `event` entries are kept; functions, errors and constructors are
//! ignored. The document may be a bare entry array or a build artifact
//! object carrying the array under `abi`.

use alloy_core::dyn_abi::DynSolType;
use alloy_json_abi::{Event, JsonAbi, Param};
use chainwatch_core::{
    error::SchemaError,
    event::EventFingerprint,
    schema::{EventSchema, FieldDef},
    types::CanonicalType,
};
use serde_json::Value;
use tracing::{debug, warn};

pub struct AbiParser;

impl AbiParser {
    /// Parse every event from a JSON ABI document.
    pub fn parse_json(json: &str) -> Result<Vec<EventSchema>, SchemaError> {
        let doc: Value = serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::build(doc)
    }

    /// Parse every event from a YAML rendering of an ABI document.
    pub fn parse_yaml(yaml: &str) -> Result<Vec<EventSchema>, SchemaError> {
        let doc: Value = serde_yaml::from_str(yaml).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::build(doc)
    }

    fn build(doc: Value) -> Result<Vec<EventSchema>, SchemaError> {
        let entries = match doc {
            Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| SchemaError::Parse("artifact object has no `abi` key".into()))?,
            entries => entries,
        };

        // alloy's param visitors borrow from the input, so read from text
        let abi: JsonAbi = serde_json::from_str(&entries.to_string())
            .map_err(|e| SchemaError::Parse(format!("invalid ABI JSON: {e}")))?;
        let mut events = abi.events;

        let mut schemas = Vec::new();
        for name in event_names_in_order(&entries) {
            // a second entry with the same name finds its slot already taken
            let mut overloads = events
                .remove(name)
                .ok_or_else(|| SchemaError::DuplicateEvent { name: name.into() })?;
            let event = match overloads.pop() {
                Some(event) if overloads.is_empty() => event,
                _ => return Err(SchemaError::DuplicateEvent { name: name.into() }),
            };

            let schema = Self::event_schema(event)?;
            if schema.anonymous {
                warn!(
                    "event '{}' is anonymous and cannot be matched by signature",
                    schema.name
                );
            }
            debug!("parsed event {} -> {}", schema.signature, schema.fingerprint);
            schemas.push(schema);
        }

        if schemas.is_empty() {
            return Err(SchemaError::Empty);
        }
        Ok(schemas)
    }

    fn event_schema(mut event: Event) -> Result<EventSchema, SchemaError> {
        let mut indexed = Vec::new();
        let mut data = Vec::new();
        for (position, param) in event.inputs.iter_mut().enumerate() {
            let declared = declared_type(&param.ty, &param.components);
            let ty = resolve_type(&declared).map_err(|reason| SchemaError::InvalidType {
                event: event.name.clone(),
                param: param.name.clone(),
                ty: param.ty.clone(),
                reason,
            })?;
            param.ty = expand_int_aliases(&param.ty);
            param.components.iter_mut().for_each(canonicalize);

            let field = FieldDef {
                name: if param.name.is_empty() {
                    format!("arg{position}")
                } else {
                    param.name.clone()
                },
                ty,
                position,
            };
            if param.indexed {
                indexed.push(field);
            } else {
                data.push(field);
            }
        }

        Ok(EventSchema {
            signature: event.signature(),
            fingerprint: EventFingerprint::new(event.selector().to_string()),
            name: event.name,
            indexed,
            data,
            anonymous: event.anonymous,
        })
    }
}

/// Names of the `event` entries, in document order.
fn event_names_in_order(entries: &Value) -> Vec<&str> {
    entries
        .as_array()
        .into_iter()
        .flatten()
        .filter(|entry| entry.get("type").and_then(Value::as_str) == Some("event"))
        .filter_map(|entry| entry.get("name").and_then(Value::as_str))
        .collect()
}

/// The full type string of a parameter, with `tuple` spelled out from its
/// components: `tuple[]` over (address, uint128) becomes `(address,uint128)[]`.
fn declared_type(ty: &str, components: &[Param]) -> String {
    match ty.strip_prefix("tuple") {
        Some(suffix) => {
            let members: Vec<_> = components
                .iter()
                .map(|c| declared_type(&c.ty, &c.components))
                .collect();
            format!("({}){suffix}", members.join(","))
        }
        None => ty.to_string(),
    }
}

/// Resolve a type string with alloy and require it to be written in
/// canonical form. `DynSolType::parse` tolerates `uint08` or `uint+8`, which
/// would hash to a signature the document never declared.
fn resolve_type(declared: &str) -> Result<CanonicalType, String> {
    let expected = expand_int_aliases(declared);
    let parsed = DynSolType::parse(&expected).map_err(|e| e.to_string())?;
    let canonical = parsed.sol_type_name();
    if canonical != expected {
        return Err(format!("not in canonical form (reads as '{canonical}')"));
    }
    let ty = to_canonical(&parsed)?;
    ty.validate()?;
    Ok(ty)
}

fn to_canonical(ty: &DynSolType) -> Result<CanonicalType, String> {
    let narrow = |n: usize| format!("width {n} out of range");
    Ok(match ty {
        DynSolType::Bool => CanonicalType::Bool,
        DynSolType::Address => CanonicalType::Address,
        DynSolType::Bytes => CanonicalType::Bytes,
        DynSolType::String => CanonicalType::Str,
        DynSolType::Uint(bits) => CanonicalType::Uint(u16::try_from(*bits).map_err(|_| narrow(*bits))?),
        DynSolType::Int(bits) => CanonicalType::Int(u16::try_from(*bits).map_err(|_| narrow(*bits))?),
        DynSolType::FixedBytes(n) => CanonicalType::FixedBytes(u8::try_from(*n).map_err(|_| narrow(*n))?),
        DynSolType::Array(elem) => CanonicalType::Array(Box::new(to_canonical(elem)?)),
        DynSolType::FixedArray(elem, len) => CanonicalType::FixedArray {
            elem: Box::new(to_canonical(elem)?),
            len: *len,
        },
        DynSolType::Tuple(members) => {
            CanonicalType::Tuple(members.iter().map(to_canonical).collect::<Result<_, _>>()?)
        }
        other => return Err(format!("'{}' cannot be an event parameter", other.sol_type_name())),
    })
}

/// Spell bare `uint` / `int` as `uint256` / `int256`.
fn expand_int_aliases(ty: &str) -> String {
    let is_delim = |c: char| matches!(c, '(' | ')' | '[' | ']' | ',');
    ty.split_inclusive(is_delim)
        .map(|piece| {
            let word = piece.trim_end_matches(is_delim);
            let rest = &piece[word.len()..];
            match word {
                "uint" => format!("uint256{rest}"),
                "int" => format!("int256{rest}"),
                _ => piece.to_string(),
            }
        })
        .collect()
}

fn canonicalize(param: &mut Param) {
    param.ty = expand_int_aliases(&param.ty);
    param.components.iter_mut().for_each(canonicalize);
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKETPLACE_ABI: &str = r#"[
      {"anonymous":false,"inputs":[
        {"indexed":true,"internalType":"uint256","name":"tokenId","type":"uint256"},
        {"indexed":true,"internalType":"address","name":"owner","type":"address"},
        {"indexed":false,"internalType":"string","name":"tokenURI","type":"string"}],
       "name":"TokenMinted","type":"event"},
      {"anonymous":false,"inputs":[
        {"indexed":true,"internalType":"uint256","name":"tokenId","type":"uint256"},
        {"indexed":false,"internalType":"uint256","name":"price","type":"uint256"},
        {"indexed":true,"internalType":"address","name":"seller","type":"address"}],
       "name":"TokenListedForSale","type":"event"},
      {"inputs":[{"name":"to","type":"address"}],"name":"mint","outputs":[],
       "stateMutability":"nonpayable","type":"function"}
    ]"#;

    #[test]
    fn parses_events_and_skips_functions() {
        let schemas = AbiParser::parse_json(MARKETPLACE_ABI).unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].name, "TokenMinted");
        assert_eq!(schemas[0].signature, "TokenMinted(uint256,address,string)");
        assert_eq!(
            schemas[0].fingerprint,
            EventFingerprint::of_signature("TokenMinted(uint256,address,string)")
        );
    }

    #[test]
    fn splits_indexed_and_data_fields_in_order() {
        let schemas = AbiParser::parse_json(MARKETPLACE_ABI).unwrap();
        let listed = &schemas[1];
        let indexed: Vec<_> = listed.indexed.iter().map(|f| f.name.as_str()).collect();
        let data: Vec<_> = listed.data.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(indexed, ["tokenId", "seller"]);
        assert_eq!(data, ["price"]);
        assert_eq!(listed.signature, "TokenListedForSale(uint256,uint256,address)");
    }

    #[test]
    fn parses_artifact_object() {
        let doc = format!(r#"{{"contractName":"Market","abi":{MARKETPLACE_ABI}}}"#);
        assert_eq!(AbiParser::parse_json(&doc).unwrap().len(), 2);
    }

    #[test]
    fn parses_yaml_document() {
        let yaml = r#"
- type: event
  name: Transfer
  anonymous: false
  inputs:
    - { name: from,  type: address, indexed: true }
    - { name: to,    type: address, indexed: true }
    - { name: value, type: uint256, indexed: false }
"#;
        let schemas = AbiParser::parse_yaml(yaml).unwrap();
        assert_eq!(
            schemas[0].fingerprint.as_hex(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn rejects_duplicate_event_names() {
        let doc = r#"[
          {"type":"event","name":"Foo","anonymous":false,"inputs":[]},
          {"type":"event","name":"Foo","anonymous":false,
           "inputs":[{"name":"a","type":"uint8","indexed":false}]}
        ]"#;
        let err = AbiParser::parse_json(doc).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateEvent { name } if name == "Foo"));
    }

    #[test]
    fn rejects_invalid_type_strings() {
        let invalid = [
            "uint7", "uint264", "bytes33", "bytes0", "strin", "uint8[0]", "uint8]",
            "uint+8", "bytes+4", "uint08", "int+256", "uint8[+2]", "uint8[02]",
        ];
        for bad in invalid {
            let doc = format!(
                r#"[{{"type":"event","name":"E","anonymous":false,
                     "inputs":[{{"name":"x","type":"{bad}","indexed":false}}]}}]"#
            );
            let err = AbiParser::parse_json(&doc).unwrap_err();
            // malformed brackets are already refused while reading the document
            assert!(
                matches!(err, SchemaError::InvalidType { ref ty, .. } if ty == bad)
                    || matches!(err, SchemaError::Parse(_)),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn invalid_type_error_carries_the_reason() {
        let doc = r#"[{"type":"event","name":"E","anonymous":false,
                       "inputs":[{"name":"x","type":"uint7","indexed":true}]}]"#;
        match AbiParser::parse_json(doc).unwrap_err() {
            SchemaError::InvalidType { event, param, ty, reason } => {
                assert_eq!((event.as_str(), param.as_str(), ty.as_str()), ("E", "x", "uint7"));
                assert!(!reason.is_empty());
            }
            other => panic!("expected InvalidType, got {other}"),
        }
    }

    #[test]
    fn rejects_malformed_and_empty_documents() {
        assert!(matches!(AbiParser::parse_json("{not json"), Err(SchemaError::Parse(_))));
        assert!(matches!(
            AbiParser::parse_json(
                r#"[{"type":"function","name":"f","inputs":[],"outputs":[],
                     "stateMutability":"view"}]"#
            ),
            Err(SchemaError::Empty)
        ));
    }

    #[test]
    fn tuple_and_array_types() {
        let doc = r#"[{"type":"event","name":"Batch","anonymous":false,"inputs":[
          {"name":"ids","type":"uint256[]","indexed":false},
          {"name":"pair","type":"address[2]","indexed":false},
          {"name":"order","type":"tuple","indexed":false,"components":[
             {"name":"maker","type":"address"},{"name":"amount","type":"uint128"}]}
        ]}]"#;
        let schemas = AbiParser::parse_json(doc).unwrap();
        assert_eq!(
            schemas[0].signature,
            "Batch(uint256[],address[2],(address,uint128))"
        );
        assert_eq!(
            schemas[0].fingerprint,
            EventFingerprint::of_signature(&schemas[0].signature)
        );
        assert_eq!(
            schemas[0].data[2].ty,
            CanonicalType::Tuple(vec![CanonicalType::Address, CanonicalType::Uint(128)])
        );
    }

    #[test]
    fn bare_int_aliases_and_unnamed_params() {
        let doc = r#"[{"type":"event","name":"E","anonymous":false,
                       "inputs":[{"name":"","type":"uint","indexed":true}]}]"#;
        let schemas = AbiParser::parse_json(doc).unwrap();
        assert_eq!(schemas[0].signature, "E(uint256)");
        assert_eq!(schemas[0].indexed[0].name, "arg0");
    }
}
