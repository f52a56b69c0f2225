use crate::sensor::SensorError;
use room_sensors::TelemetryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Private key error: {0}")]
    Key(#[from] std::io::Error),
    #[error("Credential error: {0}")]
    Credential(#[from] jsonwebtoken::errors::Error),
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
    #[error("MQTT error: {0}")]
    Mqtt(String),
    #[error("MQTT connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),
    #[error("not connected to the broker")]
    NotConnected,
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}
