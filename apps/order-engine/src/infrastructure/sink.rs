//! Channel-backed event sink.
//!
//! The hub pushes serialized events into an unbounded channel; the
//! WebSocket writer task drains it. Sends never block the publisher.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::application::ports::{EventSink, SinkError};

/// Message delivered to the writer side of a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMessage {
    /// A serialized event.
    Event(String),
    /// The sink was closed; the writer should close the connection.
    Close,
}

/// `EventSink` over an unbounded mpsc channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
    closed: AtomicBool,
}

impl ChannelSink {
    /// Create a sink and the receiver its writer drains.
    #[must_use]
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<SinkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Self {
            tx,
            closed: AtomicBool::new(false),
        });
        (sink, rx)
    }
}

impl EventSink for ChannelSink {
    fn send(&self, payload: &str) -> Result<(), SinkError> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }
        self.tx
            .send(SinkMessage::Event(payload.to_string()))
            .map_err(|_| {
                self.closed.store(true, Ordering::SeqCst);
                SinkError::Closed
            })
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Receiver may already be gone.
            let _ = self.tx.send(SinkMessage::Close);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}
