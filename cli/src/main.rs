//! ChainWatch CLI — listen to an NFT marketplace contract and report its events.
//!
//! # Commands
//! ```text
//! chainwatch watch       [--config <file>] [--rpc-url <url>] [--address <addr>] [--abi <file>]
//! chainwatch decode-log  --topics <...> --data <hex> [--abi <file>] [--json]
//! chainwatch events      [--abi <file>]
//! ```

use anyhow::{Context, Result};
use chainwatch_evm::MARKETPLACE_ABI;
use chainwatch_registry::MemoryRegistry;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod cmd_decode;
mod cmd_watch;

#[derive(Parser)]
#[command(
    name = "chainwatch",
    about = "NFT marketplace event listener — ChainWatch CLI",
    long_about = "
ChainWatch CLI: subscribe to a marketplace contract's logs over a WebSocket
RPC endpoint and print one line per TokenMinted / TokenListedForSale /
TokenSold event. Built on alloy-rs.

ENVIRONMENT VARIABLES:
  CHAINWATCH_RPC_URL    WebSocket RPC URL (overrides the config file)
  CHAINWATCH_CONTRACT   Contract address to watch
  RUST_LOG              Log filter (overrides the config file's log level)
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to the contract's logs and print decoded events
    Watch(cmd_watch::WatchArgs),

    /// Decode one EVM event log from raw topics + data
    #[command(name = "decode-log")]
    DecodeLog {
        /// topics[0] = event signature hash, topics[1..] = indexed params
        #[arg(long, num_args = 1..)]
        topics: Vec<String>,
        /// Non-indexed params (hex, 0x-prefixed)
        #[arg(long, default_value = "0x")]
        data: String,
        /// ABI file (JSON or YAML); defaults to the bundled marketplace ABI
        #[arg(long)]
        abi: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the events an ABI declares, with their fingerprints
    Events {
        /// ABI file (JSON or YAML); defaults to the bundled marketplace ABI
        #[arg(long)]
        abi: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch(args) => cmd_watch::run(args).await,
        Commands::DecodeLog {
            topics,
            data,
            abi,
            json,
        } => cmd_decode::decode_log(&topics, &data, abi.as_deref(), json),
        Commands::Events { abi } => cmd_decode::list_events(abi.as_deref()),
    }
}

/// Build the registry from `abi`, or from the bundled marketplace ABI.
pub(crate) fn load_registry(abi: Option<&Path>) -> Result<MemoryRegistry> {
    match abi {
        Some(path) => MemoryRegistry::load_file(path)
            .with_context(|| format!("failed to load ABI from '{}'", path.display())),
        None => MemoryRegistry::load_json(MARKETPLACE_ABI).context("bundled ABI is invalid"),
    }
}
