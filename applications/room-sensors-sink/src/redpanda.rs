use crate::bridge::InboundMessage;
use crate::config::RedpandaConfig;
use crate::error::SinkError;
use crate::subscription::Subscription;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Header, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub type RedpandaConsumer = StreamConsumer;
pub type RedpandaProducer = FutureProducer;

pub const DEAD_LETTER_REASON_HEADER: &str = "dead-letter-reason";

/// Offsets are stored explicitly on ack and committed in the background, so
/// nothing is committed before the bridge has settled it.
pub fn consumer_config(brokers: &str, group_id: &str, auto_offset_reset: &str) -> ClientConfig {
    let mut config = ClientConfig::new();
    config.set("bootstrap.servers", brokers);
    config.set("group.id", group_id);
    config.set("auto.offset.reset", auto_offset_reset);
    config.set("enable.partition.eof", "false");
    config.set("session.timeout.ms", "30000");
    config.set("enable.auto.commit", "true");
    config.set("enable.auto.offset.store", "false");
    config.set("auto.commit.interval.ms", "5000");
    config
}

pub fn create_consumer(
    brokers: &str,
    group_id: &str,
    auto_offset_reset: &str,
) -> Result<RedpandaConsumer, SinkError> {
    let consumer: StreamConsumer = consumer_config(brokers, group_id, auto_offset_reset).create()?;
    Ok(consumer)
}

pub fn create_producer(brokers: &str) -> Result<RedpandaProducer, SinkError> {
    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("message.timeout.ms", "5000")
        .create()?;
    Ok(producer)
}

pub async fn publish_message(
    producer: &RedpandaProducer,
    topic: &str,
    key: Option<&[u8]>,
    payload: &[u8],
    headers: OwnedHeaders,
) -> Result<(), SinkError> {
    let mut record = FutureRecord::to(topic).payload(payload).headers(headers);
    if let Some(k) = key {
        record = record.key(k);
    }

    match producer
        .send(record, Timeout::After(Duration::from_secs(5)))
        .await
    {
        Ok((_partition, _offset)) => {
            debug!(topic = topic, "message published successfully");
            Ok(())
        }
        Err((e, _message)) => {
            error!(topic = topic, error = %e, "failed to publish message");
            Err(e.into())
        }
    }
}

/// Copy the parts of a Kafka message the bridge needs.
///
/// A missing payload becomes an empty one, which the bridge rejects as
/// malformed; a missing timestamp is passed through as `None`.
pub fn to_inbound<M: Message>(message: &M) -> InboundMessage {
    let published_at = message
        .timestamp()
        .to_millis()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    InboundMessage {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        published_at,
    }
}

struct DeadLetter {
    producer: RedpandaProducer,
    topic: String,
}

pub struct KafkaSubscription {
    consumer: RedpandaConsumer,
    dead_letter: Option<DeadLetter>,
}

impl KafkaSubscription {
    pub fn connect(cfg: &RedpandaConfig) -> Result<Self, SinkError> {
        let consumer = create_consumer(&cfg.brokers, &cfg.group_id, &cfg.auto_offset_reset)?;
        consumer.subscribe(&[cfg.topic.as_str()])?;
        info!(
            brokers = %cfg.brokers,
            group_id = %cfg.group_id,
            topic = %cfg.topic,
            "subscribed to Redpanda"
        );

        let dead_letter = match &cfg.dead_letter_topic {
            Some(topic) => Some(DeadLetter {
                producer: create_producer(&cfg.brokers)?,
                topic: topic.clone(),
            }),
            None => {
                warn!("no dead-letter topic configured; malformed messages will only be logged");
                None
            }
        };

        Ok(Self {
            consumer,
            dead_letter,
        })
    }
}

#[async_trait]
impl Subscription for KafkaSubscription {
    async fn next(&mut self) -> Result<Option<InboundMessage>, SinkError> {
        let message = self.consumer.recv().await?;
        let inbound = to_inbound(&message);
        debug!(
            topic = %inbound.topic,
            partition = inbound.partition,
            offset = inbound.offset,
            payload_len = inbound.payload.len(),
            "received message"
        );
        Ok(Some(inbound))
    }

    async fn ack(&mut self, message: &InboundMessage) -> Result<(), SinkError> {
        // The stored offset is the next one to read.
        self.consumer
            .store_offset(&message.topic, message.partition, message.offset + 1)?;
        Ok(())
    }

    async fn dead_letter(&mut self, message: &InboundMessage, reason: &str) -> Result<(), SinkError> {
        let Some(dead_letter) = &self.dead_letter else {
            error!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                reason = reason,
                payload = %String::from_utf8_lossy(&message.payload),
                "dropping malformed message"
            );
            return Ok(());
        };

        let headers = OwnedHeaders::new().insert(Header {
            key: DEAD_LETTER_REASON_HEADER,
            value: Some(reason),
        });
        publish_message(
            &dead_letter.producer,
            &dead_letter.topic,
            message.key.as_deref(),
            &message.payload,
            headers,
        )
        .await?;
        info!(
            offset = message.offset,
            dead_letter_topic = %dead_letter.topic,
            reason = reason,
            "message dead-lettered"
        );
        Ok(())
    }
}
