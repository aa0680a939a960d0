//! `EvmWsListener` — `LogSource` over an Ethereum JSON-RPC WebSocket
//! subscription (`eth_subscribe("logs", filter)`).
//!
//! # Usage
//! ```no_run
//! use chainwatch_stream::{EvmWsListener, LogFilter, LogSource};
//!
//! # async fn run() -> Result<(), chainwatch_core::StreamError> {
//! let listener = EvmWsListener::new("ws://localhost:8545");
//! let sub = listener
//!     .subscribe(&LogFilter::contract("0x0165878A594ca255338adfa4d48449f69242Eb8F"))
//!     .await?;
//! # drop(sub);
//! # Ok(())
//! # }
//! ```

use crate::listener::{LogFilter, LogSource, LogSubscription, SubscriptionHandle};
use async_trait::async_trait;
use chainwatch_core::{error::StreamError, event::RawLog};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

const SUBSCRIBE_ID: u64 = 1;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// EVM WebSocket log listener.
///
/// The connection is established inside `subscribe`, so an unreachable
/// endpoint is reported to the caller directly. Once running, the first
/// socket error or close frame is delivered on the subscription's error
/// channel and the listener stops. There is no reconnect.
pub struct EvmWsListener {
    rpc_url: String,
    capacity: usize,
    connected: Arc<AtomicBool>,
}

impl EvmWsListener {
    /// Create a listener for the given `ws://` or `wss://` URL.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            capacity: 512,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bound on logs buffered between the socket and the dispatcher.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

#[async_trait]
impl LogSource for EvmWsListener {
    fn endpoint(&self) -> &str {
        &self.rpc_url
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn subscribe(&self, filter: &LogFilter) -> Result<LogSubscription, StreamError> {
        info!("connecting to {}", self.rpc_url);
        let (mut ws, _) = connect_async(self.rpc_url.as_str()).await.map_err(|e| {
            StreamError::ConnectionFailed {
                url: self.rpc_url.clone(),
                reason: e.to_string(),
            }
        })?;
        self.connected.store(true, Ordering::Relaxed);
        info!("websocket connected: {}", self.rpc_url);

        let request = subscribe_request(filter);
        if let Err(e) = ws.send(Message::Text(request.to_string())).await {
            self.connected.store(false, Ordering::Relaxed);
            return Err(StreamError::Subscription(format!("eth_subscribe not sent: {e}")));
        }

        let (handle, sub) = LogSubscription::channel(self.capacity);
        let reader_handle = handle.clone();
        let reader = tokio::spawn(async move { read_loop(ws, &reader_handle).await });
        tokio::spawn(supervise(reader, handle, Arc::clone(&self.connected)));

        Ok(sub)
    }
}

/// Wait for the reader task and report how it ended. A reader that panics
/// or is cancelled still produces a terminal error for the consumer.
async fn supervise(
    reader: JoinHandle<Option<StreamError>>,
    handle: SubscriptionHandle,
    connected: Arc<AtomicBool>,
) {
    let outcome = match reader.await {
        Ok(outcome) => outcome,
        Err(e) => Some(StreamError::Subscription(format!("websocket reader stopped: {e}"))),
    };
    connected.store(false, Ordering::Relaxed);
    match outcome {
        Some(err) => {
            error!("log subscription ended: {err}");
            handle.fail(err).await;
        }
        None => debug!("subscriber dropped; closing websocket"),
    }
}

// ─── Internal WebSocket loop ──────────────────────────────────────────────────

/// Pump socket messages into `handle` until something terminal happens.
/// Returns the error to report, or `None` if the consumer went away.
async fn read_loop(ws: WsStream, handle: &SubscriptionHandle) -> Option<StreamError> {
    let (mut write, mut read) = ws.split();

    while let Some(msg) = read.next().await {
        match msg {
            Err(e) => {
                warn!("websocket error: {e}");
                return Some(StreamError::Subscription(e.to_string()));
            }
            Ok(Message::Text(text)) => match parse_message(&text) {
                Incoming::Log(log) => {
                    if !handle.send_log(log).await {
                        return None;
                    }
                }
                Incoming::Subscribed(id) => info!("subscribed to logs, id {id}"),
                Incoming::RpcError { code, message } => {
                    return Some(StreamError::Rpc { code, message });
                }
                Incoming::Malformed(reason) => warn!("dropping log notification: {reason}"),
                Incoming::Ignored => debug!("ignored ws message: {}", preview(&text, 120)),
            },
            Ok(Message::Close(frame)) => {
                info!("websocket closed by server: {frame:?}");
                return Some(StreamError::Closed);
            }
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Ok(_) => {}
        }
        if handle.is_closed() {
            return None;
        }
    }

    Some(StreamError::Closed)
}

/// At most `max` characters of `text`, cut on a char boundary.
fn preview(text: &str, max: usize) -> &str {
    text.char_indices().nth(max).map_or(text, |(i, _)| &text[..i])
}

// ─── Message parsing ─────────────────────────────────────────────────────────

#[derive(Debug)]
enum Incoming {
    Log(RawLog),
    Subscribed(String),
    RpcError { code: i64, message: String },
    Malformed(String),
    Ignored,
}

fn subscribe_request(filter: &LogFilter) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": SUBSCRIBE_ID,
        "method": "eth_subscribe",
        "params": ["logs", build_log_filter(filter)]
    })
}

fn build_log_filter(filter: &LogFilter) -> Value {
    match filter.addresses.as_slice() {
        [] => serde_json::json!({}),
        [one] => serde_json::json!({ "address": one }),
        many => serde_json::json!({ "address": many }),
    }
}

fn parse_message(text: &str) -> Incoming {
    let v: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return Incoming::Malformed(format!("not JSON: {e}")),
    };

    if v.get("id").and_then(Value::as_u64) == Some(SUBSCRIBE_ID) {
        if let Some(err) = v.get("error") {
            return Incoming::RpcError {
                code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            };
        }
        let id = v.get("result").and_then(Value::as_str).unwrap_or("?");
        return Incoming::Subscribed(id.to_string());
    }

    if v.get("method").and_then(Value::as_str) != Some("eth_subscription") {
        return Incoming::Ignored;
    }
    match v.get("params").and_then(|p| p.get("result")) {
        Some(result) => parse_log(result),
        None => Incoming::Malformed("notification without params.result".into()),
    }
}

fn parse_log(result: &Value) -> Incoming {
    // reorged out
    if result.get("removed").and_then(Value::as_bool).unwrap_or(false) {
        return Incoming::Ignored;
    }

    let Some(address) = result.get("address").and_then(Value::as_str) else {
        return Incoming::Malformed("log without address".into());
    };
    let topics: Vec<String> = result
        .get("topics")
        .and_then(Value::as_array)
        .map(|ts| ts.iter().filter_map(|t| t.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let data_hex = result.get("data").and_then(Value::as_str).unwrap_or("0x");
    let data = match hex::decode(data_hex.strip_prefix("0x").unwrap_or(data_hex)) {
        Ok(d) => d,
        Err(e) => return Incoming::Malformed(format!("bad data hex: {e}")),
    };

    Incoming::Log(RawLog {
        address: address.to_string(),
        topics,
        data,
        block_number: hex_field(result, "blockNumber"),
        tx_hash: result
            .get("transactionHash")
            .and_then(Value::as_str)
            .map(String::from),
        log_index: hex_field(result, "logIndex"),
    })
}

fn hex_field(v: &Value, key: &str) -> Option<u64> {
    let h = v.get(key)?.as_str()?;
    u64::from_str_radix(h.strip_prefix("0x").unwrap_or(h), 16).ok()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
