//! # chainwatch-observability
//!
//! Structured logging for ChainWatch.
//!
//! Log records go to stderr so that event lines written to stdout stay
//! machine-readable. Levels are configurable per component, and JSON
//! output is available for log shippers (ELK, Loki, CloudWatch).

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig};
