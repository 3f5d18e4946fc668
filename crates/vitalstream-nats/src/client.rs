use anyhow::{Context, Result};
use async_nats::jetstream::{self, stream::Config as StreamConfig};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::traits::JetStreamPublisher;

/// NATS connection plus its JetStream context.
pub struct NatsClient {
    jetstream: jetstream::Context,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!("Connecting to NATS at {} (timeout={:?})", url, timeout);

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client);

        info!("Successfully connected to NATS");
        Ok(Self { jetstream })
    }

    /// Create the stream if it does not exist yet. Subjects follow the
    /// `{stream}.*` convention used throughout this workspace.
    pub async fn ensure_stream(&self, stream_name: &str) -> Result<()> {
        let stream_config = StreamConfig {
            name: stream_name.to_string(),
            subjects: vec![format!("{}.*", stream_name)],
            ..Default::default()
        };

        match self.jetstream.get_stream(stream_name).await {
            Ok(_) => {
                info!("Stream '{}' already exists", stream_name);
            }
            Err(_) => {
                self.jetstream
                    .create_stream(stream_config)
                    .await
                    .context("Failed to create stream")?;
                info!("Created stream '{}'", stream_name);
            }
        }

        Ok(())
    }

    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    pub fn publisher(&self) -> JetStreamContext {
        JetStreamContext(self.jetstream.clone())
    }
}

/// Thin wrapper giving the real JetStream context the publisher trait.
#[derive(Clone)]
pub struct JetStreamContext(jetstream::Context);

#[async_trait]
impl JetStreamPublisher for JetStreamContext {
    async fn publish(&self, subject: String, payload: Bytes) -> Result<u64> {
        let ack = self
            .0
            .publish(subject, payload)
            .await
            .context("Failed to publish message")?
            .await
            .context("Stream did not acknowledge message")?;

        Ok(ack.sequence)
    }
}
