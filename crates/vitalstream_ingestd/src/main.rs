mod config;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use config::ServiceConfig;
use ingest_worker::ingest_worker::{IngestWorker, IngestWorkerConfig};
use telemetry::init_telemetry;
use vitalstream_domain::ModalitySet;
use vitalstream_nats::{NatsClient, NatsRawEventForwarder};
use vitalstream_postgres::{
    PostgresClient, PostgresConfig, PostgresMetricStore, PostgresSensorDirectory,
};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_telemetry(&config.log_level);

    info!("Starting vitalstream-ingestd");
    debug!("Configuration: {:?}", config);

    if let Err(e) = run(config).await {
        error!("Service failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let startup_timeout = Duration::from_secs(config.startup_timeout_secs);

    // PostgreSQL: sensor directory + metric store share one pool
    let postgres_client = PostgresClient::new(&PostgresConfig {
        host: config.postgres_host.clone(),
        port: config.postgres_port,
        database: config.postgres_database.clone(),
        username: config.postgres_username.clone(),
        password: config.postgres_password.clone(),
        max_pool_size: config.postgres_max_pool_size,
    })?;
    tokio::time::timeout(startup_timeout, postgres_client.ping()).await??;

    let directory = Arc::new(PostgresSensorDirectory::new(
        postgres_client.clone(),
        &config.directory_table,
    ));
    let metric_store = Arc::new(PostgresMetricStore::new(
        postgres_client,
        &config.metrics_table,
    ));

    // NATS: inbound readings consumer + raw event forwarder
    let nats_client = NatsClient::connect(&config.nats_url, startup_timeout).await?;
    nats_client.ensure_stream(&config.readings_stream).await?;
    nats_client.ensure_stream(&config.raw_events_stream).await?;

    let forwarder = Arc::new(NatsRawEventForwarder::new(
        Arc::new(nats_client.publisher()),
        config.raw_events_stream.clone(),
        config.raw_events_subject.clone(),
    ));

    let worker = IngestWorker::new(
        directory,
        metric_store,
        forwarder,
        &nats_client,
        IngestWorkerConfig {
            readings_stream: config.readings_stream.clone(),
            readings_subject: config.readings_subject.clone(),
            consumer_name: config.consumer_name.clone(),
            nats_batch_size: config.nats_batch_size,
            nats_batch_wait_secs: config.nats_batch_wait_secs,
            modalities: ModalitySet::new(config.modality_names()),
            call_deadline: Some(Duration::from_secs(config.call_deadline_secs)),
        },
    )
    .await?;

    // Graceful shutdown: in-flight ingestions run to completion, the
    // consumer stops fetching new batches.
    let ctx = CancellationToken::new();
    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        signal_ctx.cancel();
    });

    worker.run(ctx).await?;

    info!("vitalstream-ingestd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install SIGINT handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
