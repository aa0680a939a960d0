//! `Dispatcher` — the classify-and-decode loop.
//!
//! Waits on whichever of the log channel and the error channel is ready
//! first. Each log is looked up by topics[0], decoded, projected into the
//! sink's event type and emitted before the next one is considered.

use crate::listener::LogSubscription;
use crate::sink::EventSink;
use chainwatch_core::{
    error::{DecodeError, StreamError},
    event::{FromLog, RawLog},
    schema::SchemaRegistry,
};
use chainwatch_evm::EvmDecoder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// What happens when a log matches a schema but fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// Log the failure, count it, and keep listening.
    #[default]
    Skip,
    /// Stop the dispatcher with `StreamError::Decode`.
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Listening,
    Terminated,
}

/// Counters for the logs seen by a dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub decoded: u64,
    pub skipped_unknown: u64,
    pub decode_errors: u64,
}

/// Single-worker dispatch loop producing `E` values.
pub struct Dispatcher<E: FromLog> {
    registry: Arc<dyn SchemaRegistry>,
    decoder: EvmDecoder,
    policy: DecodeFailurePolicy,
    options: E::Options,
    state: DispatcherState,
    stats: DispatchStats,
}

impl<E> Dispatcher<E>
where
    E: FromLog + Send + 'static,
{
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            registry,
            decoder: EvmDecoder::new(),
            policy: DecodeFailurePolicy::default(),
            options: E::Options::default(),
            state: DispatcherState::Listening,
            stats: DispatchStats::default(),
        }
    }

    pub fn with_policy(mut self, policy: DecodeFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Options passed to `E::from_log` for every decoded log.
    pub fn with_options(mut self, options: E::Options) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Run until the subscription fails, a fatal decode/sink error occurs,
    /// or the log channel is closed by its producer (`Ok(())`).
    ///
    /// Termination is final: a terminated dispatcher refuses to run again.
    pub async fn run<S>(
        &mut self,
        mut sub: LogSubscription,
        sink: &mut S,
    ) -> Result<(), StreamError>
    where
        S: EventSink<E>,
    {
        if self.state == DispatcherState::Terminated {
            return Err(StreamError::Subscription("dispatcher already terminated".into()));
        }

        info!("dispatcher listening ({} schemas)", self.registry.len());
        let result = self.listen(&mut sub, sink).await;
        self.state = DispatcherState::Terminated;

        match &result {
            Ok(()) => info!("log stream ended; dispatcher stopped ({:?})", self.stats),
            Err(e) => error!("dispatcher terminated: {e}"),
        }
        result
    }

    async fn listen<S>(
        &mut self,
        sub: &mut LogSubscription,
        sink: &mut S,
    ) -> Result<(), StreamError>
    where
        S: EventSink<E>,
    {
        let mut errors_open = true;
        loop {
            tokio::select! {
                // A queued subscription error wins over queued logs.
                biased;

                err = sub.errors.recv(), if errors_open => match err {
                    Some(e) => return Err(e),
                    None => {
                        debug!("error channel closed without an error");
                        errors_open = false;
                    }
                },

                log = sub.logs.recv() => match log {
                    Some(raw) => self.handle(raw, sink).await?,
                    None => return Ok(()),
                },
            }
        }
    }

    /// Classify, decode and emit a single log.
    pub async fn handle<S>(&mut self, raw: RawLog, sink: &mut S) -> Result<(), StreamError>
    where
        S: EventSink<E>,
    {
        self.stats.received += 1;

        match self.classify(&raw) {
            Ok(Some(event)) => {
                sink.emit(event).await?;
                self.stats.decoded += 1;
            }
            Ok(None) => {
                self.stats.skipped_unknown += 1;
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                match self.policy {
                    DecodeFailurePolicy::Skip => {
                        warn!(
                            tx = raw.tx_hash.as_deref().unwrap_or("-"),
                            "skipping undecodable log: {e}"
                        );
                    }
                    DecodeFailurePolicy::Halt => return Err(StreamError::Decode(e)),
                }
            }
        }
        Ok(())
    }

    fn classify(&self, raw: &RawLog) -> Result<Option<E>, DecodeError> {
        let fp = match self.decoder.fingerprint(raw) {
            Some(fp) => fp,
            None => {
                trace!("log without a signature topic from {}", raw.address);
                return Ok(None);
            }
        };

        let schema = match self.registry.lookup(&fp) {
            Some(s) => s,
            None => {
                trace!("no schema for fingerprint {fp}");
                return Ok(None);
            }
        };

        let decoded = self.decoder.decode(raw, schema)?;
        debug!("decoded {} from {}", decoded.event, decoded.address);
        E::from_log(decoded, &self.options)
    }
}
