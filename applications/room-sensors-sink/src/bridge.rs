use crate::error::SinkError;
use chrono::{DateTime, Utc};
use room_sensors::{Point, Sample, SamplePayload, TimeSeriesGateway};
use tracing::{debug, warn};

/// A message as delivered by the durable channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    /// Broker-assigned publish time.
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stored; safe to acknowledge.
    Ack,
    /// Can never be stored; the reason goes with the dead-lettered message.
    Nack(String),
    /// Store failed; redeliver.
    Retry,
}

/// Turns telemetry messages into stored points.
///
/// Holds no state besides the shared gateway, so clones may process
/// messages concurrently.
#[derive(Clone)]
pub struct MessageBridge {
    gateway: TimeSeriesGateway,
}

impl MessageBridge {
    pub fn new(gateway: TimeSeriesGateway) -> Self {
        Self { gateway }
    }

    /// Point for a raw message, timestamped with the broker publish time.
    pub fn decode(message: &InboundMessage) -> Result<Point, SinkError> {
        let published_at = message.published_at.ok_or(SinkError::MissingPublishTime)?;
        let payload = SamplePayload::parse(&message.payload)?;
        Ok(Point::from_sample(&Sample::new(payload, published_at)))
    }

    pub async fn process(&self, message: &InboundMessage) -> Outcome {
        let point = match Self::decode(message) {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "malformed telemetry message"
                );
                return Outcome::Nack(e.to_string());
            }
        };

        match self.gateway.write(&point).await {
            Ok(()) => {
                debug!(
                    room = point.room().unwrap_or_default(),
                    ts = %point.ts,
                    offset = message.offset,
                    "point stored"
                );
                Outcome::Ack
            }
            Err(e) => {
                warn!(
                    topic = %message.topic,
                    offset = message.offset,
                    error = %e,
                    "store write failed"
                );
                Outcome::Retry
            }
        }
    }
}
