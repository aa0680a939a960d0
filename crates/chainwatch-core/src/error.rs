//! Error types for the ChainWatch pipeline.

use thiserror::Error;

/// Errors raised while building the schema registry. Always fatal at startup.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema document parse error: {0}")]
    Parse(String),

    #[error("Duplicate event '{name}' in schema document")]
    DuplicateEvent { name: String },

    #[error("Event '{event}', parameter '{param}': invalid type '{ty}': {reason}")]
    InvalidType {
        event: String,
        param: String,
        ty: String,
        reason: String,
    },

    #[error("Schema document declares no events")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while decoding a single matched log record.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Missing topic {index} for indexed field '{field}'")]
    MissingTopic { field: String, index: usize },

    #[error("Invalid topic for field '{field}': {reason}")]
    InvalidTopic { field: String, reason: String },

    #[error("ABI decode failed for '{event}': {reason}")]
    AbiDecodeFailed { event: String, reason: String },

    #[error("Missing field '{field}' in decoded '{event}'")]
    MissingField { event: String, field: String },

    #[error("Type mismatch for '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    #[error("Value of '{field}' does not fit in {bits} bits: {value}")]
    Overflow {
        field: String,
        bits: u16,
        value: String,
    },
}

/// Errors from the log subscription and the dispatcher loop.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("RPC connection failed: {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Subscription closed unexpectedly")]
    Closed,

    #[error("Subscription failed: {0}")]
    Subscription(String),

    #[error("Decode error in stream: {0}")]
    Decode(#[from] DecodeError),

    #[error("Sink rejected event: {0}")]
    Sink(String),
}

/// Errors from loading or validating a watch configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid contract address '{0}'")]
    InvalidAddress(String),

    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
