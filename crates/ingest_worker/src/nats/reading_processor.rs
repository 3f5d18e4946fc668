use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, warn};

use vitalstream_domain::{IngestError, IngestionOutcome, IngestionService, SensorReading};
use vitalstream_nats::{Disposition, MessageProcessor};

/// Build the per-message processor that parses an inbound reading event and
/// runs it through the ingestion service.
///
/// Disposition policy:
/// - Completed and Rejected are terminal, so is a malformed event that
///   redelivery cannot repair: ack.
/// - Transient errors and partial persists nak for redelivery; the store's
///   upsert key and the duplicate-tolerant stream make redelivery safe.
pub fn create_reading_processor(service: Arc<IngestionService>) -> MessageProcessor {
    Box::new(move |payload: Bytes| {
        let service = service.clone();
        Box::pin(async move {
            let reading = match SensorReading::from_slice(&payload) {
                Ok(reading) => reading,
                Err(e) => {
                    error!(error = %e, "Dropping malformed reading event");
                    return Disposition::Ack;
                }
            };

            match service.ingest(reading).await {
                Ok(IngestionOutcome::Completed { .. }) | Ok(IngestionOutcome::Rejected) => {
                    Disposition::Ack
                }
                Ok(IngestionOutcome::CompletedWithPartialPersist { failed, .. }) => {
                    let modalities: Vec<&str> =
                        failed.iter().map(|f| f.modality.as_str()).collect();
                    warn!(
                        failed_modalities = ?modalities,
                        "Partial persist failure, requesting redelivery"
                    );
                    Disposition::Nak(Some(format!(
                        "metric records failed to persist: {}",
                        modalities.join(", ")
                    )))
                }
                Err(IngestError::MalformedReading(reason)) => {
                    error!(reason = %reason, "Dropping unprocessable reading event");
                    Disposition::Ack
                }
                Err(e) => Disposition::Nak(Some(e.to_string())),
            }
        })
    })
}
