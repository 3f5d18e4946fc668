mod client;
mod config;
mod metric_store;
mod sensor_directory;

pub use client::PostgresClient;
pub use config::PostgresConfig;
pub use metric_store::PostgresMetricStore;
pub use sensor_directory::PostgresSensorDirectory;
