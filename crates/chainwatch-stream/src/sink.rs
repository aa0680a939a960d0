//! Event sinks: where decoded events go once the dispatcher is done with them.

use async_trait::async_trait;
use chainwatch_core::error::StreamError;
use std::fmt::Display;
use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::info;

/// Consumer of decoded events. A sink error is fatal to the dispatcher.
#[async_trait]
pub trait EventSink<E: Send + 'static>: Send {
    async fn emit(&mut self, event: E) -> Result<(), StreamError>;
}

/// Writes one `Display` line per event.
pub struct WriterSink<W> {
    out: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl WriterSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

#[async_trait]
impl<E, W> EventSink<E> for WriterSink<W>
where
    E: Display + Send + 'static,
    W: Write + Send,
{
    async fn emit(&mut self, event: E) -> Result<(), StreamError> {
        writeln!(self.out, "{event}")
            .and_then(|_| self.out.flush())
            .map_err(|e| StreamError::Sink(e.to_string()))
    }
}

/// Forwards events into a Tokio channel for downstream consumers.
pub struct ChannelSink<E> {
    tx: mpsc::Sender<E>,
}

impl<E> ChannelSink<E> {
    pub fn new(tx: mpsc::Sender<E>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiver it feeds.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<E>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl<E: Send + 'static> EventSink<E> for ChannelSink<E> {
    async fn emit(&mut self, event: E) -> Result<(), StreamError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| StreamError::Sink("receiver dropped".into()))
    }
}

/// Emits each event as a structured `info!` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl<E: Display + Send + 'static> EventSink<E> for TracingSink {
    async fn emit(&mut self, event: E) -> Result<(), StreamError> {
        info!(target: "chainwatch::events", event = %event, "decoded event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writer_sink_writes_one_line_per_event() {
        let mut sink = WriterSink::new(Vec::new());
        sink.emit("first").await.unwrap();
        sink.emit("second").await.unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "first\nsecond\n");
    }

    #[tokio::test]
    async fn channel_sink_forwards_and_reports_closed_receiver() {
        let (mut sink, mut rx) = ChannelSink::channel(2);
        sink.emit(7u32).await.unwrap();
        assert_eq!(rx.recv().await, Some(7));

        drop(rx);
        assert!(matches!(sink.emit(8u32).await, Err(StreamError::Sink(_))));
    }

    #[tokio::test]
    async fn tracing_sink_never_fails() {
        assert!(TracingSink.emit("event").await.is_ok());
    }
}
