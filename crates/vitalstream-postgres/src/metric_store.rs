use async_trait::async_trait;
use tracing::{debug, error};

use vitalstream_domain::{
    FailedMetric, IngestError, IngestResult, MetricRecord, MetricStore, PersistReport,
};

use crate::client::PostgresClient;

/// PostgreSQL implementation of the durable metric store.
///
/// Records are upserted one at a time so a single bad record cannot poison
/// the whole submission; failures are collected into the report instead.
/// The upsert key (patient_id, sensor_id, recorded_at, modality) makes
/// resubmission overwrite rather than duplicate.
#[derive(Clone)]
pub struct PostgresMetricStore {
    client: PostgresClient,
    upsert_sql: String,
}

impl PostgresMetricStore {
    pub fn new(client: PostgresClient, table: &str) -> Self {
        let upsert_sql = format!(
            "INSERT INTO {table} \
             (patient_id, sensor_id, recorded_at, modality, value, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (patient_id, sensor_id, recorded_at, modality) \
             DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at"
        );
        Self { client, upsert_sql }
    }
}

#[async_trait]
impl MetricStore for PostgresMetricStore {
    async fn save_metrics(&self, records: Vec<MetricRecord>) -> IngestResult<PersistReport> {
        if records.is_empty() {
            debug!("No metric records to persist, skipping");
            return Ok(PersistReport::default());
        }

        // Failing to get a connection at all is a transient error for the
        // whole submission, not a per-record failure.
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(IngestError::Repository)?;

        let mut written = 0;
        let mut failed = Vec::new();

        for record in &records {
            let result = conn
                .execute(
                    &self.upsert_sql,
                    &[
                        &record.patient_id,
                        &record.sensor_id,
                        &record.recorded_at,
                        &record.modality,
                        &record.value,
                        &record.expires_at,
                    ],
                )
                .await;

            match result {
                Ok(_) => written += 1,
                Err(e) => {
                    error!(
                        sensor_id = %record.sensor_id,
                        modality = %record.modality,
                        error = %e,
                        "Failed to persist metric record"
                    );
                    failed.push(FailedMetric {
                        sensor_id: record.sensor_id.clone(),
                        modality: record.modality.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            written,
            failed_count = failed.len(),
            "Persisted metric record batch"
        );

        Ok(PersistReport { written, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostgresConfig;

    #[test]
    fn test_upsert_sql_overwrites_on_natural_key_conflict() {
        let client = PostgresClient::new(&PostgresConfig::default()).unwrap();
        let store = PostgresMetricStore::new(client, "metric_records");

        assert!(store.upsert_sql.starts_with("INSERT INTO metric_records"));
        assert!(store
            .upsert_sql
            .contains("ON CONFLICT (patient_id, sensor_id, recorded_at, modality)"));
        assert!(store.upsert_sql.contains("DO UPDATE SET value"));
    }
}
