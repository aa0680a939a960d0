//! Watch configuration.

use crate::dispatcher::DecodeFailurePolicy;
use chainwatch_core::error::ConfigError;
use chainwatch_evm::Narrowing;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Everything needed to bootstrap one contract watch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// WebSocket RPC endpoint, e.g. "wss://mainnet.infura.io/ws/v3/..."
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Contract whose logs are subscribed to
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    /// ABI document describing the contract's events (None = bundled marketplace ABI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi_path: Option<PathBuf>,
    /// Capacity of the log channel between listener and dispatcher
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub on_decode_error: DecodeFailurePolicy,
    #[serde(default)]
    pub narrowing: Narrowing,
}

fn default_rpc_url() -> String {
    "ws://localhost:8545".into()
}
fn default_contract_address() -> String {
    "0x0165878A594ca255338adfa4d48449f69242Eb8F".into()
}
fn default_channel_capacity() -> usize {
    512
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            contract_address: default_contract_address(),
            abi_path: None,
            channel_capacity: default_channel_capacity(),
            on_decode_error: DecodeFailurePolicy::default(),
            narrowing: Narrowing::default(),
        }
    }
}

impl WatchConfig {
    /// Parse a YAML config. JSON is valid YAML, so this accepts both.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a `.yaml` / `.yml` / `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Self::from_yaml(&text)
        }
    }

    /// Check the endpoint URL and the contract address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.rpc_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.rpc_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidUrl {
                url: self.rpc_url.clone(),
                reason: format!("log subscriptions need ws:// or wss://, got {}://", url.scheme()),
            });
        }

        let hex = self
            .contract_address
            .strip_prefix("0x")
            .unwrap_or(&self.contract_address);
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidAddress(self.contract_address.clone()));
        }
        Ok(())
    }
}
