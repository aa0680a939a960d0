//! # chainwatch-registry
//!
//! Schema Registry for ChainWatch.
//!
//! Parses a contract ABI document (JSON, YAML, or a build artifact with an
//! `abi` key) once at startup into an immutable index of event schemas,
//! keyed by signature hash and by name.
//!
//! The public-facing API is the `SchemaRegistry` trait from `chainwatch-core`.

pub mod abi;
pub mod memory;

pub use abi::AbiParser;
pub use memory::MemoryRegistry;
