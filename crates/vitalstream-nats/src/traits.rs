use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Trait for JetStream publish operations.
/// Abstracted so the forwarder can be tested without a running NATS server.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JetStreamPublisher: Send + Sync {
    /// Publish a message to a subject, await the stream's acknowledgment,
    /// and return the sequence number the stream assigned.
    async fn publish(&self, subject: String, payload: Bytes) -> Result<u64>;
}
