//! `chainwatch watch` — run the live listener.

use anyhow::{Context, Result};
use chainwatch_core::{DecodedLog, FromLog, SchemaRegistry, StreamError};
use chainwatch_evm::{MarketplaceEvent, Narrowing};
use chainwatch_observability::{init_tracing, LogConfig};
use chainwatch_stream::{
    DecodeFailurePolicy, Dispatcher, EvmWsListener, LogFilter, LogSource, LogSubscription,
    WatchConfig, WriterSink,
};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Config file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// WebSocket RPC URL
    #[arg(long, env = "CHAINWATCH_RPC_URL")]
    rpc_url: Option<String>,
    /// Contract address to subscribe to
    #[arg(long, env = "CHAINWATCH_CONTRACT")]
    address: Option<String>,
    /// ABI file describing the contract's events
    #[arg(long)]
    abi: Option<PathBuf>,
    /// Stop on the first log that cannot be decoded
    #[arg(long)]
    halt_on_decode_error: bool,
    /// Reject token IDs that do not fit in 64 bits instead of truncating
    #[arg(long)]
    checked_narrowing: bool,
    /// Emit JSON structured logs
    #[arg(long)]
    json_logs: bool,
    /// Print every ABI event generically instead of the marketplace report
    #[arg(long)]
    generic: bool,
}

/// On-disk config: watch settings plus a `log:` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(flatten)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        let parsed: Result<Self> = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&text).map_err(anyhow::Error::from)
        } else {
            serde_yaml::from_str(&text).map_err(anyhow::Error::from)
        };
        parsed.with_context(|| format!("invalid config '{}'", path.display()))
    }
}

impl WatchArgs {
    /// Merge flags over the file config (flags win).
    fn resolve(self) -> Result<(FileConfig, bool)> {
        let mut config = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let watch = &mut config.watch;
        if let Some(url) = self.rpc_url {
            watch.rpc_url = url;
        }
        if let Some(address) = self.address {
            watch.contract_address = address;
        }
        if self.abi.is_some() {
            watch.abi_path = self.abi;
        }
        if self.halt_on_decode_error {
            watch.on_decode_error = DecodeFailurePolicy::Halt;
        }
        if self.checked_narrowing {
            watch.narrowing = Narrowing::Checked;
        }
        if self.json_logs {
            config.log.json = true;
        }
        Ok((config, self.generic))
    }
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let (config, generic) = args.resolve()?;
    init_tracing(&config.log).context("failed to install the log subscriber")?;

    let watch = config.watch;
    watch.validate().context("invalid watch configuration")?;

    let registry: Arc<dyn SchemaRegistry> =
        Arc::new(crate::load_registry(watch.abi_path.as_deref())?);
    info!(
        "loaded {} event schema(s); watching {} via {}",
        registry.len(),
        watch.contract_address,
        watch.rpc_url
    );

    let listener =
        EvmWsListener::new(watch.rpc_url.as_str()).with_capacity(watch.channel_capacity);
    let sub = listener
        .subscribe(&LogFilter::contract(watch.contract_address.as_str()))
        .await
        .with_context(|| format!("cannot subscribe to logs at {}", listener.endpoint()))?;

    let outcome = if generic {
        dispatch::<DecodedLog>(registry, sub, watch.on_decode_error, ()).await
    } else {
        dispatch::<MarketplaceEvent>(registry, sub, watch.on_decode_error, watch.narrowing).await
    };

    match outcome {
        Ok(()) => Ok(()),
        // already reported by the dispatcher
        Err(_) => std::process::exit(1),
    }
}

async fn dispatch<E>(
    registry: Arc<dyn SchemaRegistry>,
    sub: LogSubscription,
    policy: DecodeFailurePolicy,
    options: E::Options,
) -> Result<(), StreamError>
where
    E: FromLog + Display + Send + 'static,
{
    let mut dispatcher = Dispatcher::<E>::new(registry)
        .with_policy(policy)
        .with_options(options);
    let mut sink = WriterSink::stdout();

    tokio::select! {
        result = dispatcher.run(sub, &mut sink) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
            Ok(())
        }
    }
}
