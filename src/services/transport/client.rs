//! Request/reply transport interface used by the dispatcher.
use async_trait::async_trait;
use thiserror::Error;

use crate::services::dispatch::{MessageEnvelope, ReplyPacket};

/// Transport-level failures (the backend never produced a reply).
///
/// Backend-declared errors are NOT transport errors; they arrive as a
/// [`ReplyPacket`] with `err` set.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport connection error: {0}")]
    Connection(String),
    #[error("transport command error: {0}")]
    Command(String),
    #[error("invalid reply: {0}")]
    InvalidReply(String),
}

/// A reliable-once-connected request/reply primitive.
///
/// Implementations must release whatever they hold for a call (reply
/// subscriptions, keys) when the returned future is dropped early.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    // Transport name (for logging).
    fn backend_name(&self) -> &'static str;

    // Send `envelope` to `address` and wait for its correlated reply.
    async fn request(
        &self,
        address: &str,
        envelope: &MessageEnvelope,
    ) -> Result<ReplyPacket, TransportError>;
}
