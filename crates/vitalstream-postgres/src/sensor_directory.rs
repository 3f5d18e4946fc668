use async_trait::async_trait;
use tracing::debug;

use vitalstream_domain::{IngestError, IngestResult, SensorDirectory};

use crate::client::PostgresClient;

/// PostgreSQL implementation of the sensor-to-patient directory.
///
/// The directory table is read-only from this crate's perspective; device
/// provisioning writes it elsewhere.
#[derive(Clone)]
pub struct PostgresSensorDirectory {
    client: PostgresClient,
    lookup_sql: String,
}

impl PostgresSensorDirectory {
    pub fn new(client: PostgresClient, table: &str) -> Self {
        // Table identifiers cannot be bound as parameters; the name is
        // validated non-empty at startup and comes from configuration,
        // not from inbound events.
        let lookup_sql = format!("SELECT patient_id FROM {table} WHERE sensor_id = $1");
        Self { client, lookup_sql }
    }
}

#[async_trait]
impl SensorDirectory for PostgresSensorDirectory {
    async fn resolve_owner(&self, sensor_id: &str) -> IngestResult<Option<String>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(IngestError::Repository)?;

        // query_opt keeps "no mapping" distinct from a failed query: the
        // former is Ok(None), only the latter is an error.
        let row = conn
            .query_opt(&self.lookup_sql, &[&sensor_id])
            .await
            .map_err(|e| IngestError::Repository(e.into()))?;

        let patient_id: Option<String> = row.map(|r| r.get(0));
        debug!(
            sensor_id = %sensor_id,
            resolved = patient_id.is_some(),
            "Sensor directory lookup"
        );

        Ok(patient_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PostgresConfig;

    #[test]
    fn test_lookup_sql_targets_configured_table() {
        let client = PostgresClient::new(&PostgresConfig::default()).unwrap();
        let directory = PostgresSensorDirectory::new(client, "sensors");
        assert_eq!(
            directory.lookup_sql,
            "SELECT patient_id FROM sensors WHERE sensor_id = $1"
        );
    }
}
