pub mod envelope;
pub mod error;
pub mod ingestion_service;
pub mod metric;
pub mod reading;
pub mod repository;

pub use envelope::{ForwardAck, RawEventEnvelope};
pub use error::{IngestError, IngestResult};
pub use ingestion_service::{IngestionOutcome, IngestionService};
pub use metric::{decompose, FailedMetric, MetricRecord, PersistReport};
pub use reading::{ModalitySet, SensorReading};
pub use repository::{MetricStore, RawEventForwarder, SensorDirectory};
