use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use vitalstream_domain::{
    IngestionService, MetricStore, ModalitySet, RawEventForwarder, SensorDirectory,
};
use vitalstream_nats::{NatsClient, NatsConsumer};

use crate::nats::create_reading_processor;

pub struct IngestWorkerConfig {
    pub readings_stream: String,
    pub readings_subject: String,
    pub consumer_name: String,
    pub nats_batch_size: usize,
    pub nats_batch_wait_secs: u64,
    pub modalities: ModalitySet,
    pub call_deadline: Option<Duration>,
}

/// Consumes inbound reading events and drives each through the ingestion
/// service (resolve, decompose, persist, forward).
pub struct IngestWorker {
    readings_consumer: NatsConsumer,
}

impl IngestWorker {
    pub async fn new(
        directory: Arc<dyn SensorDirectory>,
        metric_store: Arc<dyn MetricStore>,
        forwarder: Arc<dyn RawEventForwarder>,
        nats_client: &NatsClient,
        config: IngestWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!("Initializing ingest worker");

        let mut service =
            IngestionService::new(directory, metric_store, forwarder, config.modalities);
        if let Some(deadline) = config.call_deadline {
            service = service.with_call_deadline(deadline);
        }

        let processor = create_reading_processor(Arc::new(service));
        let readings_consumer = NatsConsumer::new(
            nats_client.jetstream(),
            &config.readings_stream,
            &config.consumer_name,
            &config.readings_subject,
            config.nats_batch_size,
            config.nats_batch_wait_secs,
            processor,
        )
        .await?;

        info!("Ingest worker initialized");

        Ok(Self { readings_consumer })
    }

    pub async fn run(&self, ctx: CancellationToken) -> anyhow::Result<()> {
        self.readings_consumer.run(ctx).await
    }
}
