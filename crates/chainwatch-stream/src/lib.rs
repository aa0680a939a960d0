//! # chainwatch-stream
//!
//! Live event pipeline for ChainWatch.
//!
//! Subscribes to contract logs over an RPC WebSocket, routes each log
//! through the Schema Registry, decodes it, and hands the typed result to
//! a sink.
//!
//! ## Architecture
//! ```text
//! LogSource::subscribe(filter)
//!       │
//!       ▼
//! LogSubscription { logs, errors }     two channels, one producer task
//!       │
//!       ▼
//! Dispatcher::run                      select! over logs and errors
//!       │   topics[0] → SchemaRegistry::lookup
//!       │   EvmDecoder::decode → FromLog projection
//!       ▼
//! EventSink::emit
//! ```

pub mod config;
pub mod dispatcher;
pub mod listener;
pub mod sink;
pub mod ws_listener;

pub use config::WatchConfig;
pub use dispatcher::{DecodeFailurePolicy, DispatchStats, Dispatcher, DispatcherState};
pub use listener::{LogFilter, LogSource, LogSubscription, SubscriptionHandle};
pub use sink::{ChannelSink, EventSink, TracingSink, WriterSink};
pub use ws_listener::EvmWsListener;
