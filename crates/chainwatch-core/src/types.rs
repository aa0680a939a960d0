//! ABI parameter types and the normalized values they decode into.
//!
//! Decoded values are normalized into a small, serializable value model so
//! sinks and projections never handle ABI word layouts directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An event parameter type, as declared in the schema document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    /// Unsigned integer (uint8 .. uint256). Width in bits.
    Uint(u16),
    /// Signed integer (int8 .. int256). Width in bits.
    Int(u16),
    Bool,
    /// 20-byte EVM address
    Address,
    /// Fixed-size byte array (bytes1 .. bytes32). Length in bytes.
    FixedBytes(u8),
    /// Variable-length byte array
    Bytes,
    /// UTF-8 string
    Str,
    /// Variable-length array of a type
    Array(Box<CanonicalType>),
    /// Fixed-length array of a type
    FixedArray { elem: Box<CanonicalType>, len: usize },
    /// Tuple / struct, components in declaration order
    Tuple(Vec<CanonicalType>),
}

impl CanonicalType {
    /// Whether an indexed parameter of this type is stored in its topic as
    /// the keccak256 of its encoding rather than as the value itself.
    pub fn is_dynamic_ref(&self) -> bool {
        matches!(
            self,
            CanonicalType::Str
                | CanonicalType::Bytes
                | CanonicalType::Array(_)
                | CanonicalType::FixedArray { .. }
                | CanonicalType::Tuple(_)
        )
    }

    /// Check widths and lengths: `uintN`/`intN` need N in 8..=256 and a
    /// multiple of 8, `bytesN` needs N in 1..=32, fixed arrays a non-zero length.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            CanonicalType::Uint(bits) | CanonicalType::Int(bits)
                if *bits == 0 || *bits > 256 || bits % 8 != 0 =>
            {
                Err(format!("integer width {bits} is not a multiple of 8 in 8..=256"))
            }
            CanonicalType::FixedBytes(n) if *n == 0 || *n > 32 => {
                Err(format!("fixed bytes length {n} is outside 1..=32"))
            }
            CanonicalType::FixedArray { len: 0, .. } => Err("fixed array of length 0".into()),
            CanonicalType::Array(elem) | CanonicalType::FixedArray { elem, .. } => elem.validate(),
            CanonicalType::Tuple(members) => members.iter().try_for_each(|m| m.validate()),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalType::Uint(bits) => write!(f, "uint{bits}"),
            CanonicalType::Int(bits) => write!(f, "int{bits}"),
            CanonicalType::Bool => write!(f, "bool"),
            CanonicalType::Address => write!(f, "address"),
            CanonicalType::FixedBytes(n) => write!(f, "bytes{n}"),
            CanonicalType::Bytes => write!(f, "bytes"),
            CanonicalType::Str => write!(f, "string"),
            CanonicalType::Array(elem) => write!(f, "{elem}[]"),
            CanonicalType::FixedArray { elem, len } => write!(f, "{elem}[{len}]"),
            CanonicalType::Tuple(components) => {
                let parts: Vec<_> = components.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", parts.join(","))
            }
        }
    }
}

/// A decoded, normalized value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum NormalizedValue {
    Uint(u128),
    /// Large uints (> u128) stored as decimal string
    BigUint(String),
    Int(i128),
    /// Large ints (outside i128) stored as decimal string
    BigInt(String),
    Bool(bool),
    /// EVM address, 0x-prefixed EIP-55 checksummed hex
    Address(String),
    Bytes(Vec<u8>),
    Str(String),
    /// Topic of an indexed reference type; the value itself is unrecoverable
    Hash256(String),
    Array(Vec<NormalizedValue>),
    Tuple(Vec<NormalizedValue>),
}

impl NormalizedValue {
    /// Returns the inner string if this is an Address value.
    pub fn as_address(&self) -> Option<&str> {
        match self {
            NormalizedValue::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the inner string if this is a Str value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NormalizedValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerce to a u128 if this is a small Uint.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            NormalizedValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Short name of the variant, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizedValue::Uint(_) | NormalizedValue::BigUint(_) => "uint",
            NormalizedValue::Int(_) | NormalizedValue::BigInt(_) => "int",
            NormalizedValue::Bool(_) => "bool",
            NormalizedValue::Address(_) => "address",
            NormalizedValue::Bytes(_) => "bytes",
            NormalizedValue::Str(_) => "string",
            NormalizedValue::Hash256(_) => "hash256",
            NormalizedValue::Array(_) => "array",
            NormalizedValue::Tuple(_) => "tuple",
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedValue::Uint(v) => write!(f, "{v}"),
            NormalizedValue::BigUint(v) => write!(f, "{v}"),
            NormalizedValue::Int(v) => write!(f, "{v}"),
            NormalizedValue::BigInt(v) => write!(f, "{v}"),
            NormalizedValue::Bool(v) => write!(f, "{v}"),
            NormalizedValue::Address(a) => write!(f, "{a}"),
            NormalizedValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            NormalizedValue::Str(s) => write!(f, "{s}"),
            NormalizedValue::Hash256(h) => write!(f, "{h}"),
            NormalizedValue::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            NormalizedValue::Tuple(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}
