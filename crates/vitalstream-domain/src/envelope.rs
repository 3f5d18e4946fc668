use serde_json::Value;

use crate::reading::SensorReading;

/// The raw inbound event enriched with its resolved patient, destined for
/// the append-only analytics stream. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEventEnvelope {
    pub sensor_id: String,
    pub patient_id: String,
    /// The original event object with `patientId` injected.
    pub payload: serde_json::Map<String, Value>,
}

impl RawEventEnvelope {
    pub fn new(reading: &SensorReading, patient_id: &str) -> Self {
        let mut payload = reading.payload.clone();
        payload.insert(
            "patientId".to_string(),
            Value::String(patient_id.to_string()),
        );
        Self {
            sensor_id: reading.sensor_id.clone(),
            patient_id: patient_id.to_string(),
            payload,
        }
    }
}

/// Acknowledgment returned by the stream on a successful append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardAck {
    pub stream: String,
    pub sequence: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_injects_patient_and_keeps_extras() {
        let reading = SensorReading::from_json(json!({
            "sensorId": "777",
            "ecg": 24,
            "firmware": "1.2.3",
            "timestamp": 1643008976,
        }))
        .unwrap();

        let envelope = RawEventEnvelope::new(&reading, "patientX");

        assert_eq!(envelope.payload["patientId"], json!("patientX"));
        assert_eq!(envelope.payload["sensorId"], json!("777"));
        assert_eq!(envelope.payload["firmware"], json!("1.2.3"));
        assert_eq!(envelope.payload["ecg"], json!(24));
    }
}
