use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{IngestError, IngestResult};

/// One inbound telemetry event from a sensor, parsed but not yet resolved
/// to a patient.
///
/// The original JSON object is retained in `payload` so that the forwarded
/// envelope carries every field the device sent, including fields the
/// decomposition step does not recognize.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub sensor_id: String,
    pub recorded_at: DateTime<Utc>,
    pub payload: serde_json::Map<String, Value>,
}

impl SensorReading {
    /// Parse an inbound event from its JSON representation.
    ///
    /// Requires `sensorId` (non-empty string) and `timestamp` (integer epoch
    /// seconds). Everything else is carried through untouched.
    pub fn from_json(value: Value) -> IngestResult<Self> {
        let Value::Object(payload) = value else {
            return Err(IngestError::MalformedReading(
                "event is not a JSON object".to_string(),
            ));
        };

        let sensor_id = payload
            .get("sensorId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                IngestError::MalformedReading("missing or empty sensorId".to_string())
            })?
            .to_string();

        let epoch = payload
            .get("timestamp")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                IngestError::MalformedReading("missing or non-integer timestamp".to_string())
            })?;

        let recorded_at = DateTime::from_timestamp(epoch, 0).ok_or_else(|| {
            IngestError::MalformedReading(format!("timestamp {epoch} is out of range"))
        })?;

        Ok(Self {
            sensor_id,
            recorded_at,
            payload,
        })
    }

    /// Parse an inbound event from raw bytes (e.g. a stream message body).
    pub fn from_slice(bytes: &[u8]) -> IngestResult<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| IngestError::MalformedReading(format!("invalid JSON: {e}")))?;
        Self::from_json(value)
    }
}

/// Allow-list of modality names that decomposition turns into metric records.
///
/// Keys outside the set still travel in the forwarded envelope; they just
/// never become metrics. Ordered so decomposition output is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalitySet(BTreeSet<String>);

impl Default for ModalitySet {
    fn default() -> Self {
        Self::new(["ecg", "heartrate", "temp"].map(String::from))
    }
}

impl ModalitySet {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self(names.into_iter().collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_success() {
        let reading = SensorReading::from_json(json!({
            "sensorId": "777",
            "ecg": 24,
            "heartrate": 68,
            "temp": 36.7,
            "timestamp": 1643008976,
        }))
        .unwrap();

        assert_eq!(reading.sensor_id, "777");
        assert_eq!(reading.recorded_at.timestamp(), 1643008976);
        assert_eq!(reading.payload.len(), 5);
    }

    #[test]
    fn test_from_json_missing_sensor_id() {
        let result = SensorReading::from_json(json!({ "timestamp": 1643008976 }));
        assert!(matches!(result, Err(IngestError::MalformedReading(_))));
    }

    #[test]
    fn test_from_json_empty_sensor_id() {
        let result = SensorReading::from_json(json!({
            "sensorId": "",
            "timestamp": 1643008976,
        }));
        assert!(matches!(result, Err(IngestError::MalformedReading(_))));
    }

    #[test]
    fn test_from_json_missing_timestamp() {
        let result = SensorReading::from_json(json!({ "sensorId": "777" }));
        assert!(matches!(result, Err(IngestError::MalformedReading(_))));
    }

    #[test]
    fn test_from_json_fractional_timestamp_rejected() {
        let result = SensorReading::from_json(json!({
            "sensorId": "777",
            "timestamp": 1643008976.5,
        }));
        assert!(matches!(result, Err(IngestError::MalformedReading(_))));
    }

    #[test]
    fn test_from_json_non_object() {
        let result = SensorReading::from_json(json!([1, 2, 3]));
        assert!(matches!(result, Err(IngestError::MalformedReading(_))));
    }

    #[test]
    fn test_from_slice_invalid_json() {
        let result = SensorReading::from_slice(b"not json");
        assert!(matches!(result, Err(IngestError::MalformedReading(_))));
    }

    #[test]
    fn test_default_modality_set() {
        let modalities = ModalitySet::default();
        assert!(modalities.contains("ecg"));
        assert!(modalities.contains("heartrate"));
        assert!(modalities.contains("temp"));
        assert!(!modalities.contains("spo2"));
    }

    #[test]
    fn test_modality_set_iteration_is_sorted() {
        let modalities = ModalitySet::new(["temp", "ecg", "heartrate"].map(String::from));
        let names: Vec<&str> = modalities.iter().collect();
        assert_eq!(names, vec!["ecg", "heartrate", "temp"]);
    }
}
