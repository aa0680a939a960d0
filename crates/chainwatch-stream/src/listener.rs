//! `LogSource` trait — abstraction over the RPC log subscription.
//!
//! A subscription is two channels fed by one producer: the live sequence
//! of raw logs, and a terminal error channel that carries at most one
//! error before the producer goes away.

use async_trait::async_trait;
use chainwatch_core::{error::StreamError, event::RawLog};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Which logs the node should deliver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    /// Contract addresses to filter on (empty = all contracts)
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl LogFilter {
    /// Filter on a single contract address.
    pub fn contract(address: impl Into<String>) -> Self {
        Self {
            addresses: vec![address.into()],
        }
    }
}

/// Consumer side of a live log subscription.
#[derive(Debug)]
pub struct LogSubscription {
    pub logs: mpsc::Receiver<RawLog>,
    pub errors: mpsc::Receiver<StreamError>,
}

/// Producer side of a [`LogSubscription`].
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    logs: mpsc::Sender<RawLog>,
    errors: mpsc::Sender<StreamError>,
}

impl LogSubscription {
    /// Create a connected producer/consumer pair. `capacity` bounds the
    /// number of undelivered logs.
    pub fn channel(capacity: usize) -> (SubscriptionHandle, LogSubscription) {
        let (log_tx, log_rx) = mpsc::channel(capacity.max(1));
        let (err_tx, err_rx) = mpsc::channel(1);
        (
            SubscriptionHandle {
                logs: log_tx,
                errors: err_tx,
            },
            LogSubscription {
                logs: log_rx,
                errors: err_rx,
            },
        )
    }
}

impl SubscriptionHandle {
    /// Deliver one log. Returns `false` once the consumer is gone.
    pub async fn send_log(&self, log: RawLog) -> bool {
        self.logs.send(log).await.is_ok()
    }

    /// Report the terminal error and close both channels.
    pub async fn fail(self, err: StreamError) {
        let _ = self.errors.send(err).await;
    }

    /// Whether the consumer has dropped its side.
    pub fn is_closed(&self) -> bool {
        self.logs.is_closed()
    }
}

/// Abstracts over RPC backends able to push contract logs.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Endpoint this source connects to.
    fn endpoint(&self) -> &str;

    /// Connect and start streaming logs matching `filter`.
    async fn subscribe(&self, filter: &LogFilter) -> Result<LogSubscription, StreamError>;

    /// Returns `true` if the source is currently connected.
    fn is_connected(&self) -> bool;
}
