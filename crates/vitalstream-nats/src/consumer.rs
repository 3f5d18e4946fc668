use anyhow::{Context, Result};
use async_nats::jetstream::{self, consumer::PullConsumer, AckKind};
use bytes::Bytes;
use futures::{future::BoxFuture, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What to do with a message after processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Processed to a terminal outcome; acknowledge so it is not redelivered.
    Ack,
    /// Processing failed in a way redelivery could fix; reject with an
    /// optional reason for the stream's advisory log.
    Nak(Option<String>),
}

/// Type alias for the per-message processor function.
/// Takes the raw message body; deserialization and business logic live in
/// the processor, not the consumer.
pub type MessageProcessor = Box<dyn Fn(Bytes) -> BoxFuture<'static, Disposition> + Send + Sync>;

/// Generic JetStream pull consumer: fetches batches, delegates each message
/// to the processor, and acks or naks per its disposition.
pub struct NatsConsumer {
    consumer: PullConsumer,
    batch_size: usize,
    max_wait: Duration,
    processor: MessageProcessor,
}

impl NatsConsumer {
    pub async fn new(
        jetstream: &jetstream::Context,
        stream_name: &str,
        consumer_name: &str,
        subject_filter: &str,
        batch_size: usize,
        max_wait_secs: u64,
        processor: MessageProcessor,
    ) -> Result<Self> {
        debug!(
            stream = stream_name,
            consumer = consumer_name,
            subject = subject_filter,
            "Creating JetStream consumer"
        );

        let consumer = jetstream
            .create_consumer_on_stream(
                jetstream::consumer::pull::Config {
                    name: Some(consumer_name.to_string()),
                    durable_name: Some(consumer_name.to_string()),
                    filter_subject: subject_filter.to_string(),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
                stream_name,
            )
            .await
            .context("Failed to create consumer")?;

        info!(
            stream = stream_name,
            consumer = consumer_name,
            "Consumer created successfully"
        );

        Ok(Self {
            consumer,
            batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            processor,
        })
    }

    pub async fn run(&self, ctx: CancellationToken) -> Result<()> {
        info!("Starting consumer loop");

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("Received shutdown signal, stopping consumer");
                    break;
                }
                result = self.fetch_and_process_batch() => {
                    if let Err(e) = result {
                        error!(error = %e, "Error processing batch");
                        // Keep consuming despite errors.
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!("Consumer stopped gracefully");
        Ok(())
    }

    async fn fetch_and_process_batch(&self) -> Result<()> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(self.batch_size)
            .expires(self.max_wait)
            .messages()
            .await
            .context("Failed to fetch messages")?;

        while let Some(result) = messages.next().await {
            let message = match result {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "Failed to receive message from batch");
                    continue;
                }
            };

            // Once processing starts, the message runs to a disposition;
            // shutdown is only observed between batches.
            let disposition = (self.processor)(message.payload.clone()).await;

            match disposition {
                Disposition::Ack => {
                    if let Err(e) = message.ack().await {
                        warn!(error = %e, "Failed to ack message");
                    }
                }
                Disposition::Nak(reason) => {
                    if let Some(reason) = &reason {
                        debug!(reason = %reason, "Nak'ing message for redelivery");
                    }
                    if let Err(e) = message.ack_with(AckKind::Nak(None)).await {
                        warn!(error = %e, "Failed to nak message");
                    }
                }
            }
        }

        Ok(())
    }
}
