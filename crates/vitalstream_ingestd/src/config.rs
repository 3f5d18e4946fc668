use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// JetStream stream carrying inbound sensor reading events
    #[serde(default = "default_readings_stream")]
    pub readings_stream: String,

    /// Subject pattern for the readings consumer filter
    #[serde(default = "default_readings_subject")]
    pub readings_subject: String,

    /// Durable consumer name
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// JetStream stream receiving forwarded raw events (the analytics feed)
    #[serde(default = "default_raw_events_stream")]
    pub raw_events_stream: String,

    /// Base subject for forwarded raw events; the sensor id is appended
    #[serde(default = "default_raw_events_subject")]
    pub raw_events_subject: String,

    /// Batch size for the readings consumer
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Max wait time for batches in seconds
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // PostgreSQL configuration
    /// PostgreSQL host
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    /// PostgreSQL port
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// PostgreSQL database name
    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    /// PostgreSQL username
    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    /// PostgreSQL password
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    /// Maximum connections in the pool
    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    /// Table holding the sensor-to-patient directory
    #[serde(default = "default_directory_table")]
    pub directory_table: String,

    /// Table holding decomposed metric records
    #[serde(default = "default_metrics_table")]
    pub metrics_table: String,

    // Ingestion configuration
    /// Comma-separated modality allow-list
    #[serde(default = "default_modalities")]
    pub modalities: String,

    /// Deadline in seconds for each external call during ingestion
    #[serde(default = "default_call_deadline_secs")]
    pub call_deadline_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_readings_stream() -> String {
    "sensor-readings".to_string()
}

fn default_readings_subject() -> String {
    "sensor-readings.*".to_string()
}

fn default_consumer_name() -> String {
    "vitalstream-ingestd".to_string()
}

fn default_raw_events_stream() -> String {
    "raw-events".to_string()
}

fn default_raw_events_subject() -> String {
    "raw-events".to_string()
}

fn default_nats_batch_size() -> usize {
    100
}

fn default_nats_batch_wait_secs() -> u64 {
    5
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "vitalstream".to_string()
}

fn default_postgres_username() -> String {
    "vitalstream".to_string()
}

fn default_postgres_password() -> String {
    "vitalstream".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    10
}

fn default_directory_table() -> String {
    "sensors".to_string()
}

fn default_metrics_table() -> String {
    "metric_records".to_string()
}

fn default_modalities() -> String {
    "ecg,heartrate,temp".to_string()
}

fn default_call_deadline_secs() -> u64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(Environment::with_prefix("VITALSTREAM"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// The stream and table identifiers route every external call; an empty
    /// one would only fail later and further from the misconfiguration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("readings_stream", &self.readings_stream),
            ("raw_events_stream", &self.raw_events_stream),
            ("raw_events_subject", &self.raw_events_subject),
            ("directory_table", &self.directory_table),
            ("metrics_table", &self.metrics_table),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Message(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Parse the comma-separated modality allow-list.
    pub fn modality_names(&self) -> Vec<String> {
        self.modalities
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.raw_events_stream, "raw-events");
        assert_eq!(config.directory_table, "sensors");
        assert_eq!(
            config.modality_names(),
            vec!["ecg", "heartrate", "temp"]
        );
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("VITALSTREAM_MODALITIES", "ecg, spo2");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.modality_names(), vec!["ecg", "spo2"]);

        std::env::remove_var("VITALSTREAM_MODALITIES");
    }

    #[test]
    fn test_empty_stream_identifier_is_rejected() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("VITALSTREAM_RAW_EVENTS_STREAM", "  ");

        let result = ServiceConfig::from_env();
        assert!(result.is_err());

        std::env::remove_var("VITALSTREAM_RAW_EVENTS_STREAM");
    }
}
