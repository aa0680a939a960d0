//! # chainwatch-core
//!
//! Core types and traits shared across all ChainWatch crates.
//! The schema registry, the EVM decoder and the dispatcher loop all
//! speak in terms of the types defined here.

pub mod error;
pub mod event;
pub mod schema;
pub mod types;

pub use error::{ConfigError, DecodeError, SchemaError, StreamError};
pub use event::{DecodedLog, EventFingerprint, FromLog, RawLog};
pub use schema::{EventSchema, FieldDef, SchemaRegistry};
pub use types::{CanonicalType, NormalizedValue};
