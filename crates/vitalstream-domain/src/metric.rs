use chrono::{DateTime, Days, Utc};
use serde_json::Value;

use crate::error::{IngestError, IngestResult};
use crate::reading::{ModalitySet, SensorReading};

/// One persisted datapoint: a single modality of a single reading, resolved
/// to its owning patient and stamped with an expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub patient_id: String,
    pub sensor_id: String,
    pub recorded_at: DateTime<Utc>,
    /// Epoch seconds at which the store may drop this record.
    pub expires_at: i64,
    pub modality: String,
    pub value: f64,
}

/// A record the store could not write, identified well enough for the caller
/// to retry or alert on it.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedMetric {
    pub sensor_id: String,
    pub modality: String,
    pub reason: String,
}

/// Outcome of one batch submission to the metric store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistReport {
    pub written: usize,
    pub failed: Vec<FailedMetric>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Split one reading into independent per-modality metric records.
///
/// Only allow-listed keys with numeric values become records; a reading with
/// no recognized modalities yields an empty vec, which is valid. The expiry
/// advances the timestamp by one *calendar day* while keeping the time of
/// day (a date-field increment, not +86400 seconds). Note the retention skew
/// this carries over from the existing deployment: a reading at 23:59:59Z is
/// kept for roughly a day plus its time-of-day, one at 00:00:01Z for roughly
/// a day minus it. Every expiry still lands on calendar date D+1.
pub fn decompose(
    reading: &SensorReading,
    patient_id: &str,
    modalities: &ModalitySet,
) -> IngestResult<Vec<MetricRecord>> {
    let expires_at = reading
        .recorded_at
        .checked_add_days(Days::new(1))
        .ok_or_else(|| {
            IngestError::MalformedReading(format!(
                "timestamp {} has no representable expiry",
                reading.recorded_at
            ))
        })?
        .timestamp();

    let records = modalities
        .iter()
        .filter_map(|modality| {
            let value = reading.payload.get(modality).and_then(Value::as_f64)?;
            Some(MetricRecord {
                patient_id: patient_id.to_string(),
                sensor_id: reading.sensor_id.clone(),
                recorded_at: reading.recorded_at,
                expires_at,
                modality: modality.to_string(),
                value,
            })
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(value: serde_json::Value) -> SensorReading {
        SensorReading::from_json(value).unwrap()
    }

    #[test]
    fn test_decompose_one_record_per_recognized_modality() {
        let reading = reading(json!({
            "sensorId": "777",
            "ecg": 24,
            "heartrate": 68,
            "temp": 36.7,
            "timestamp": 1643008976,
        }));

        let records = decompose(&reading, "patientX", &ModalitySet::default()).unwrap();

        assert_eq!(records.len(), 3);
        let modalities: Vec<&str> = records.iter().map(|r| r.modality.as_str()).collect();
        assert_eq!(modalities, vec!["ecg", "heartrate", "temp"]);
        for record in &records {
            assert_eq!(record.patient_id, "patientX");
            assert_eq!(record.sensor_id, "777");
            assert_eq!(record.recorded_at.timestamp(), 1643008976);
        }
        assert_eq!(records[0].value, 24.0);
        assert_eq!(records[1].value, 68.0);
        assert_eq!(records[2].value, 36.7);
    }

    #[test]
    fn test_decompose_unrecognized_keys_are_not_metrics() {
        let reading = reading(json!({
            "sensorId": "777",
            "heartrate": 70,
            "spo2": 98,
            "firmware": "1.2.3",
            "timestamp": 1643008976,
        }));

        let records = decompose(&reading, "patientX", &ModalitySet::default()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].modality, "heartrate");
    }

    #[test]
    fn test_decompose_no_modalities_is_empty_and_valid() {
        let reading = reading(json!({
            "sensorId": "777",
            "timestamp": 1643008976,
        }));

        let records = decompose(&reading, "patientX", &ModalitySet::default()).unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn test_decompose_non_numeric_modality_is_skipped() {
        let reading = reading(json!({
            "sensorId": "777",
            "ecg": "garbled",
            "temp": 36.7,
            "timestamp": 1643008976,
        }));

        let records = decompose(&reading, "patientX", &ModalitySet::default()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].modality, "temp");
    }

    #[test]
    fn test_expiry_lands_on_next_calendar_date_regardless_of_time_of_day() {
        // 2022-01-24T23:59:59Z and 2022-01-25T00:00:01Z straddle midnight.
        for (epoch, expected_date) in [(1643068799, "2022-01-25"), (1643068801, "2022-01-26")] {
            let reading = reading(json!({
                "sensorId": "777",
                "temp": 36.7,
                "timestamp": epoch,
            }));

            let records = decompose(&reading, "patientX", &ModalitySet::default()).unwrap();
            let expiry = DateTime::from_timestamp(records[0].expires_at, 0).unwrap();

            assert_eq!(expiry.format("%Y-%m-%d").to_string(), expected_date);
        }
    }

    #[test]
    fn test_expiry_keeps_time_of_day() {
        let reading = reading(json!({
            "sensorId": "777",
            "temp": 36.7,
            "timestamp": 1643008976,
        }));

        let records = decompose(&reading, "patientX", &ModalitySet::default()).unwrap();

        assert_eq!(records[0].expires_at, 1643008976 + 86_400);
    }

    #[test]
    fn test_persist_report_completeness() {
        assert!(PersistReport::default().is_complete());
        let report = PersistReport {
            written: 2,
            failed: vec![FailedMetric {
                sensor_id: "777".to_string(),
                modality: "ecg".to_string(),
                reason: "write throttled".to_string(),
            }],
        };
        assert!(!report.is_complete());
    }
}
