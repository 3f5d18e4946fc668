use async_trait::async_trait;

use crate::envelope::{ForwardAck, RawEventEnvelope};
use crate::error::IngestResult;
use crate::metric::{MetricRecord, PersistReport};

/// Read-only sensor-to-patient directory.
/// Infrastructure layer (e.g., vitalstream-postgres) implements this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SensorDirectory: Send + Sync {
    /// Resolve the patient a sensor is mapped to. Absence of a mapping is
    /// `Ok(None)`, an expected branch; only transient backing-store failures
    /// are errors.
    async fn resolve_owner(&self, sensor_id: &str) -> IngestResult<Option<String>>;
}

/// Durable store for decomposed metric records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Persist a batch as one logical submission. An empty batch is a no-op
    /// success. Per-record failures are enumerated in the report rather than
    /// failing the whole call; total unavailability of the store is an error.
    /// Writes are upserts keyed on (patient, sensor, timestamp, modality),
    /// so resubmission overwrites instead of duplicating.
    async fn save_metrics(&self, records: Vec<MetricRecord>) -> IngestResult<PersistReport>;
}

/// Append-only forwarder onto the durable analytics stream.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RawEventForwarder: Send + Sync {
    /// Append one envelope. At-least-once: the forwarder does not retry
    /// internally and downstream consumers tolerate duplicates.
    async fn forward(&self, envelope: RawEventEnvelope) -> IngestResult<ForwardAck>;
}
