//! Event Sink Port (Driven Port)
//!
//! One live subscriber connection. Sends are synchronous and must not
//! block: implementations hand the payload to a buffer or channel and
//! return.

/// Errors delivering to a sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The connection is closed.
    #[error("sink closed")]
    Closed,

    /// Delivery failed for another reason.
    #[error("sink send failed: {message}")]
    SendFailed {
        /// Error details.
        message: String,
    },
}

/// A subscriber connection that accepts serialized events.
pub trait EventSink: Send + Sync {
    /// Deliver one serialized event.
    fn send(&self, payload: &str) -> Result<(), SinkError>;

    /// Close the connection. Idempotent.
    fn close(&self);

    /// Whether the connection is closed.
    fn is_closed(&self) -> bool;
}
