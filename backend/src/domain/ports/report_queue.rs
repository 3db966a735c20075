//! Ports describing the durable report request queue.
//!
//! Messages are opaque to the queue: a partition key (the user identifier as
//! a string) and a serialised body. Requests with equal keys are delivered in
//! publication order; delivery is at-least-once.

use async_trait::async_trait;

use super::define_port_error;

/// One queued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Partition key; all messages for one user share a key.
    pub key: String,
    /// Serialised request body.
    pub payload: Vec<u8>,
}

impl QueueMessage {
    /// Build a message from a key and body.
    pub fn new(key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            payload,
        }
    }
}

define_port_error! {
    /// Errors surfaced by the queue adapter.
    pub enum ReportQueueError {
        /// Queue infrastructure is unavailable.
        Unavailable { message: String } => "report queue is unavailable: {message}",
        /// The message was not acknowledged.
        Rejected { message: String } => "report request was rejected: {message}",
        /// The request body could not be encoded.
        Encode { message: String } => "report request encoding failed: {message}",
    }
}

/// Producer side of the queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportQueue: Send + Sync {
    /// Publish `message`, returning once the queue has acknowledged it.
    async fn publish(&self, message: QueueMessage) -> Result<(), ReportQueueError>;
}

/// Consumer side of the queue.
///
/// Handlers own their failure policy: the queue treats every return as an
/// acknowledgement, so malformed messages are never redelivered.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueMessageHandler: Send + Sync {
    /// Process one delivered message.
    async fn handle(&self, message: QueueMessage);
}
