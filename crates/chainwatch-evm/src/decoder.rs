//! `EvmDecoder` — decodes a raw EVM log against its event schema.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, I256, U256};
use chainwatch_core::{
    error::DecodeError,
    event::{DecodedLog, EventFingerprint, RawLog},
    schema::{EventSchema, FieldDef},
    types::{CanonicalType, NormalizedValue},
};
use indexmap::IndexMap;

use crate::{fingerprint, normalizer};

/// The EVM log decoder.
/// Stateless, so it is cheap to clone and share across tasks.
#[derive(Debug, Default, Clone)]
pub struct EvmDecoder;

impl EvmDecoder {
    pub fn new() -> Self {
        Self
    }

    /// The fingerprint carried in topics[0], if well-formed.
    pub fn fingerprint(&self, raw: &RawLog) -> Option<EventFingerprint> {
        fingerprint::from_topics(&raw.topics)
    }

    /// Decode `raw` against `schema`: indexed fields positionally from
    /// topics[1..], non-indexed fields from the ABI-encoded data payload.
    pub fn decode(&self, raw: &RawLog, schema: &EventSchema) -> Result<DecodedLog, DecodeError> {
        let mut decoded: Vec<(&FieldDef, NormalizedValue)> =
            Vec::with_capacity(schema.indexed.len() + schema.data.len());

        // topics[0] is the event signature unless the event is anonymous
        let first_topic = if schema.anonymous { 0 } else { 1 };
        for (i, field) in schema.indexed.iter().enumerate() {
            let topic_idx = first_topic + i;
            let topic = raw
                .topics
                .get(topic_idx)
                .ok_or_else(|| DecodeError::MissingTopic {
                    field: field.name.clone(),
                    index: topic_idx,
                })?;
            decoded.push((field, self.decode_topic(topic, field)?));
        }

        decoded.extend(schema.data.iter().zip(self.decode_data(&raw.data, schema)?));
        decoded.sort_by_key(|(field, _)| field.position);

        let fields: IndexMap<String, NormalizedValue> = decoded
            .into_iter()
            .map(|(field, value)| (field.name.clone(), value))
            .collect();

        Ok(DecodedLog {
            event: schema.name.clone(),
            fingerprint: schema.fingerprint.clone(),
            address: raw.address.clone(),
            block_number: raw.block_number,
            tx_hash: raw.tx_hash.clone(),
            fields,
        })
    }

    /// Decode a single indexed topic.
    ///
    /// Value types are stored in the word itself. Reference types (string,
    /// bytes, arrays, tuples) are stored as the keccak256 of their encoding,
    /// so the original value is unrecoverable and the raw word is returned.
    fn decode_topic(
        &self,
        topic: &str,
        field: &FieldDef,
    ) -> Result<NormalizedValue, DecodeError> {
        let invalid = |reason| DecodeError::InvalidTopic {
            field: field.name.clone(),
            reason,
        };
        field.ty.validate().map_err(invalid)?;
        let word = fingerprint::topic_word(topic).map_err(invalid)?;

        let value = match &field.ty {
            ty if ty.is_dynamic_ref() => {
                NormalizedValue::Hash256(format!("0x{}", hex::encode(word)))
            }
            CanonicalType::Uint(bits) => {
                normalizer::normalize_uint(U256::from_be_bytes(word) & width_mask(*bits))
            }
            CanonicalType::Int(bits) => {
                normalizer::normalize_int(sign_extend(U256::from_be_bytes(word), *bits))
            }
            CanonicalType::Address => {
                NormalizedValue::Address(Address::from_slice(&word[12..]).to_checksum(None))
            }
            CanonicalType::Bool => NormalizedValue::Bool(word.iter().any(|b| *b != 0)),
            CanonicalType::FixedBytes(n) => NormalizedValue::Bytes(word[..*n as usize].to_vec()),
            other => {
                return Err(DecodeError::TypeMismatch {
                    field: field.name.clone(),
                    expected: "indexable value type".into(),
                    got: other.to_string(),
                })
            }
        };
        Ok(value)
    }

    /// Decode the non-indexed parameters as one ABI parameter tuple.
    fn decode_data(
        &self,
        data: &[u8],
        schema: &EventSchema,
    ) -> Result<Vec<NormalizedValue>, DecodeError> {
        if schema.data.is_empty() {
            return Ok(Vec::new());
        }
        for field in &schema.data {
            field.ty.validate().map_err(|reason| DecodeError::AbiDecodeFailed {
                event: schema.name.clone(),
                reason: format!("field '{}': {reason}", field.name),
            })?;
        }

        let tuple_type =
            DynSolType::Tuple(schema.data.iter().map(|f| canonical_to_dyn(&f.ty)).collect());
        let decoded = tuple_type
            .abi_decode_params(data)
            .map_err(|e| DecodeError::AbiDecodeFailed {
                event: schema.name.clone(),
                reason: e.to_string(),
            })?;

        let values = match decoded {
            DynSolValue::Tuple(vals) => vals,
            other => vec![other],
        };
        if values.len() != schema.data.len() {
            return Err(DecodeError::AbiDecodeFailed {
                event: schema.name.clone(),
                reason: format!("expected {} values, got {}", schema.data.len(), values.len()),
            });
        }
        Ok(values.into_iter().map(normalizer::normalize).collect())
    }
}

/// Build the alloy `DynSolType` for a `CanonicalType`.
fn canonical_to_dyn(ty: &CanonicalType) -> DynSolType {
    match ty {
        CanonicalType::Uint(bits) => DynSolType::Uint(*bits as usize),
        CanonicalType::Int(bits) => DynSolType::Int(*bits as usize),
        CanonicalType::Bool => DynSolType::Bool,
        CanonicalType::Address => DynSolType::Address,
        CanonicalType::FixedBytes(n) => DynSolType::FixedBytes(*n as usize),
        CanonicalType::Bytes => DynSolType::Bytes,
        CanonicalType::Str => DynSolType::String,
        CanonicalType::Array(elem) => DynSolType::Array(Box::new(canonical_to_dyn(elem))),
        CanonicalType::FixedArray { elem, len } => {
            DynSolType::FixedArray(Box::new(canonical_to_dyn(elem)), *len)
        }
        CanonicalType::Tuple(components) => {
            DynSolType::Tuple(components.iter().map(canonical_to_dyn).collect())
        }
    }
}

/// Mask keeping the low `bits` bits. Narrowing is unchecked: higher bits of
/// an oversized topic value are dropped.
fn width_mask(bits: u16) -> U256 {
    if bits >= 256 {
        U256::MAX
    } else {
        (U256::from(1u8) << bits as usize) - U256::from(1u8)
    }
}

/// Truncate to `bits` and sign-extend from bit `bits - 1`.
fn sign_extend(raw: U256, bits: u16) -> I256 {
    if bits >= 256 {
        return I256::from_raw(raw);
    }
    let mask = width_mask(bits);
    let low = raw & mask;
    if low.bit(bits as usize - 1) {
        I256::from_raw(low | !mask)
    } else {
        I256::from_raw(low)
    }
}
