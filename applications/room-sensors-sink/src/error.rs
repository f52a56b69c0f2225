use room_sensors::TelemetryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Kafka/Redpanda error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
    #[error("message has no publish timestamp")]
    MissingPublishTime,
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}
