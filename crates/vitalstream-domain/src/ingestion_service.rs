use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::envelope::{ForwardAck, RawEventEnvelope};
use crate::error::{IngestError, IngestResult};
use crate::metric::{decompose, FailedMetric};
use crate::reading::{ModalitySet, SensorReading};
use crate::repository::{MetricStore, RawEventForwarder, SensorDirectory};

/// Terminal outcome of one ingestion.
///
/// An unmapped sensor and a partially failed persist are expected branches,
/// not errors: the former short-circuits everything, the latter still
/// forwards the raw event. Only transient failures surface as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionOutcome {
    Completed {
        records_written: usize,
        ack: ForwardAck,
    },
    CompletedWithPartialPersist {
        records_written: usize,
        failed: Vec<FailedMetric>,
        ack: ForwardAck,
    },
    /// The sensor has no directory entry. Logged, nothing persisted or
    /// forwarded.
    Rejected,
}

/// Orchestrates one reading through resolve, decompose, persist, forward.
///
/// Flow:
/// 1. Resolve the owning patient via the sensor directory (fail fast on
///    unmapped sensors)
/// 2. Decompose the reading into per-modality metric records
/// 3. Persist the records (empty batches pass through)
/// 4. Build the enriched envelope and append it to the analytics stream
///
/// Persisting always precedes forwarding, and success is emitted only after
/// the forward acknowledges. All dependencies are injected so concurrent
/// ingestions share no mutable state.
pub struct IngestionService {
    directory: Arc<dyn SensorDirectory>,
    metric_store: Arc<dyn MetricStore>,
    forwarder: Arc<dyn RawEventForwarder>,
    modalities: ModalitySet,
    call_deadline: Option<Duration>,
}

impl IngestionService {
    pub fn new(
        directory: Arc<dyn SensorDirectory>,
        metric_store: Arc<dyn MetricStore>,
        forwarder: Arc<dyn RawEventForwarder>,
        modalities: ModalitySet,
    ) -> Self {
        Self {
            directory,
            metric_store,
            forwarder,
            modalities,
            call_deadline: None,
        }
    }

    /// Bound every external call by a deadline. An elapsed deadline surfaces
    /// as a retryable repository error.
    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = Some(deadline);
        self
    }

    pub async fn ingest(&self, reading: SensorReading) -> IngestResult<IngestionOutcome> {
        debug!(sensor_id = %reading.sensor_id, "Resolving sensor owner");

        let owner = self
            .bounded(
                "sensor directory lookup",
                self.directory.resolve_owner(&reading.sensor_id),
            )
            .await?;

        let Some(patient_id) = owner else {
            warn!(sensor_id = %reading.sensor_id, "Sensor has no owner mapping, rejecting reading");
            return Ok(IngestionOutcome::Rejected);
        };

        let records = decompose(&reading, &patient_id, &self.modalities)?;
        debug!(
            sensor_id = %reading.sensor_id,
            patient_id = %patient_id,
            record_count = records.len(),
            "Decomposed reading"
        );

        let report = self
            .bounded("metric persist", self.metric_store.save_metrics(records))
            .await?;

        if !report.is_complete() {
            warn!(
                sensor_id = %reading.sensor_id,
                patient_id = %patient_id,
                failed_count = report.failed.len(),
                "Some metric records failed to persist, forwarding raw event regardless"
            );
        }

        // The raw event path is independent of the decomposed-metric path,
        // so forwarding proceeds even after a partial persist failure.
        let envelope = RawEventEnvelope::new(&reading, &patient_id);
        let ack = self
            .bounded("raw event forward", self.forwarder.forward(envelope))
            .await?;

        info!(
            sensor_id = %reading.sensor_id,
            patient_id = %patient_id,
            records_written = report.written,
            stream = %ack.stream,
            sequence = ack.sequence,
            "Ingestion completed"
        );

        if report.is_complete() {
            Ok(IngestionOutcome::Completed {
                records_written: report.written,
                ack,
            })
        } else {
            Ok(IngestionOutcome::CompletedWithPartialPersist {
                records_written: report.written,
                failed: report.failed,
                ack,
            })
        }
    }

    async fn bounded<T>(
        &self,
        step: &'static str,
        fut: impl Future<Output = IngestResult<T>>,
    ) -> IngestResult<T> {
        match self.call_deadline {
            Some(deadline) => tokio::time::timeout(deadline, fut)
                .await
                .map_err(|_| {
                    IngestError::Repository(anyhow!("{step} exceeded deadline of {deadline:?}"))
                })?,
            None => fut.await,
        }
    }
}
