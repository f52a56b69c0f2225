use crate::error::{Result, TelemetryError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire form of a reading as published by the device.
///
/// The device clock is not trusted, so the payload carries no timestamp; the
/// observation time is assigned on ingestion from the broker publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePayload {
    pub room: String,
    pub temperature: f32,
    pub pressure: f32,
    pub humidity: f32,
}

impl SamplePayload {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let parsed: Self = serde_json::from_slice(payload)?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.room.trim().is_empty() {
            return Err(TelemetryError::InvalidSample("room is empty".into()));
        }
        for (name, value) in [
            ("temperature", self.temperature),
            ("pressure", self.pressure),
            ("humidity", self.humidity),
        ] {
            if !value.is_finite() {
                return Err(TelemetryError::InvalidSample(format!(
                    "{} is not a finite number",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// A single environmental reading for one room.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub room: String,
    pub temperature: f32,
    pub pressure: f32,
    pub humidity: f32,
    pub observed_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(payload: SamplePayload, observed_at: DateTime<Utc>) -> Self {
        Self {
            room: payload.room,
            temperature: payload.temperature,
            pressure: payload.pressure,
            humidity: payload.humidity,
            observed_at,
        }
    }

    pub fn payload(&self) -> SamplePayload {
        SamplePayload {
            room: self.room.clone(),
            temperature: self.temperature,
            pressure: self.pressure,
            humidity: self.humidity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_payload() {
        let payload =
            br#"{"room":"living","temperature":21.5,"pressure":1013.2,"humidity":40.0}"#;
        let parsed = SamplePayload::parse(payload).unwrap();
        assert_eq!(parsed.room, "living");
        assert_eq!(parsed.temperature, 21.5);
        assert_eq!(parsed.pressure, 1013.2);
        assert_eq!(parsed.humidity, 40.0);
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let payload = br#"{"room":"living","temperature":21.5,"pressure":1013.2}"#;
        assert!(matches!(
            SamplePayload::parse(payload),
            Err(TelemetryError::Json(_))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        let payload =
            br#"{"room":"living","temperature":"warm","pressure":1013.2,"humidity":40.0}"#;
        assert!(SamplePayload::parse(payload).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_room() {
        let payload = br#"{"room":" ","temperature":21.5,"pressure":1013.2,"humidity":40.0}"#;
        assert!(matches!(
            SamplePayload::parse(payload),
            Err(TelemetryError::InvalidSample(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SamplePayload::parse(b"not json").is_err());
        assert!(SamplePayload::parse(b"").is_err());
    }

    #[test]
    fn test_payload_wire_shape() {
        let sample = Sample {
            room: "kitchen".into(),
            temperature: 20.0,
            pressure: 1000.0,
            humidity: 50.0,
            observed_at: Utc::now(),
        };
        let json: serde_json::Value =
            serde_json::from_slice(&sample.payload().to_vec().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "room": "kitchen",
                "temperature": 20.0,
                "pressure": 1000.0,
                "humidity": 50.0
            })
        );
    }
}
