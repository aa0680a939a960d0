//! # chainwatch-evm
//!
//! EVM log decoding for ChainWatch.
//!
//! ## Implementation notes
//! - Uses `alloy-core` dyn-abi for the data payload
//! - Topics[0] → event signature fingerprint (keccak256)
//! - Topics[1..] → indexed parameters, one 32-byte word each
//! - `data` → non-indexed parameters (ABI-encoded parameter tuple)

pub mod decoder;
pub mod fingerprint;
pub mod marketplace;
pub mod normalizer;

pub use decoder::EvmDecoder;
pub use marketplace::{MarketplaceEvent, Narrowing, MARKETPLACE_ABI};
