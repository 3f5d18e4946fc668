use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info};

use vitalstream_domain::{ForwardAck, IngestError, IngestResult, RawEventEnvelope, RawEventForwarder};

use crate::traits::JetStreamPublisher;

/// JetStream implementation of the append-only raw-event forwarder.
///
/// One publish per envelope, at-least-once: no internal retry, failures
/// go back to the orchestrator's caller.
pub struct NatsRawEventForwarder {
    jetstream: Arc<dyn JetStreamPublisher>,
    stream: String,
    base_subject: String,
}

impl NatsRawEventForwarder {
    pub fn new(jetstream: Arc<dyn JetStreamPublisher>, stream: String, base_subject: String) -> Self {
        info!(
            stream = %stream,
            base_subject = %base_subject,
            "Created raw event forwarder"
        );
        Self {
            jetstream,
            stream,
            base_subject,
        }
    }
}

#[async_trait]
impl RawEventForwarder for NatsRawEventForwarder {
    async fn forward(&self, envelope: RawEventEnvelope) -> IngestResult<ForwardAck> {
        let payload = serde_json::to_vec(&envelope.payload)
            .context("Failed to serialize envelope")
            .map_err(IngestError::Repository)?;

        // Per-sensor subjects keep per-partition ordering downstream.
        let subject = format!("{}.{}", self.base_subject, envelope.sensor_id);

        debug!(
            subject = %subject,
            sensor_id = %envelope.sensor_id,
            size_bytes = payload.len(),
            "Forwarding raw event"
        );

        let sequence = self
            .jetstream
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish and acknowledge raw event")
            .map_err(IngestError::Repository)?;

        info!(
            subject = %subject,
            sensor_id = %envelope.sensor_id,
            sequence,
            "Forwarded raw event"
        );

        Ok(ForwardAck {
            stream: self.stream.clone(),
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockJetStreamPublisher;
    use bytes::Bytes;
    use serde_json::json;
    use vitalstream_domain::SensorReading;

    fn envelope() -> RawEventEnvelope {
        let reading = SensorReading::from_json(json!({
            "sensorId": "777",
            "ecg": 24,
            "timestamp": 1643008976,
        }))
        .unwrap();
        RawEventEnvelope::new(&reading, "patientX")
    }

    #[tokio::test]
    async fn test_forward_publishes_enriched_payload() {
        // Arrange
        let mut mock_jetstream = MockJetStreamPublisher::new();

        mock_jetstream
            .expect_publish()
            .withf(|subject: &String, payload: &Bytes| {
                let value: serde_json::Value = serde_json::from_slice(payload).unwrap();
                subject == "raw-events.777" && value["patientId"] == json!("patientX")
            })
            .times(1)
            .returning(|_, _| Ok(7));

        let forwarder = NatsRawEventForwarder::new(
            Arc::new(mock_jetstream),
            "raw-events".to_string(),
            "raw-events".to_string(),
        );

        // Act
        let ack = forwarder.forward(envelope()).await.unwrap();

        // Assert
        assert_eq!(
            ack,
            ForwardAck {
                stream: "raw-events".to_string(),
                sequence: 7,
            }
        );
    }

    #[tokio::test]
    async fn test_forward_failure_is_retryable() {
        // Arrange
        let mut mock_jetstream = MockJetStreamPublisher::new();

        mock_jetstream
            .expect_publish()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("NATS publish failed")));

        let forwarder = NatsRawEventForwarder::new(
            Arc::new(mock_jetstream),
            "raw-events".to_string(),
            "raw-events".to_string(),
        );

        // Act
        let result = forwarder.forward(envelope()).await;

        // Assert
        assert!(matches!(result, Err(IngestError::Repository(_))));
    }
}
