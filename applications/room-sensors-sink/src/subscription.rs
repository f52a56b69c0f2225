use crate::bridge::{InboundMessage, MessageBridge, Outcome};
use crate::error::SinkError;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Source side of the durable channel.
#[async_trait]
pub trait Subscription: Send {
    /// Next message, waiting for one if needed. `None` once the source is closed.
    async fn next(&mut self) -> Result<Option<InboundMessage>, SinkError>;

    /// Mark the message as consumed; it will not be redelivered.
    async fn ack(&mut self, message: &InboundMessage) -> Result<(), SinkError>;

    /// Park a message that can never be processed.
    async fn dead_letter(&mut self, message: &InboundMessage, reason: &str) -> Result<(), SinkError>;
}

/// Capped exponential backoff between redelivery attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    initial: Duration,
    max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max))
    }
}

/// Feed every message of `subscription` through `bridge` until `shutdown`
/// resolves or the subscription closes.
///
/// A message is acknowledged only after it was stored, or after it was
/// dead-lettered as malformed. A message still being retried at shutdown is
/// left unacknowledged and will be redelivered.
pub async fn run<S, F>(
    bridge: &MessageBridge,
    subscription: &mut S,
    retry: RetryPolicy,
    shutdown: F,
) -> Result<(), SinkError>
where
    S: Subscription,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        let received = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested");
                return Ok(());
            }
            res = subscription.next() => res,
        };

        let message = match received {
            Ok(Some(m)) => m,
            Ok(None) => {
                info!("subscription closed");
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "receive failed; continuing after short delay");
                if interrupted(&mut shutdown, Duration::from_secs(2)).await {
                    return Ok(());
                }
                continue;
            }
        };

        if !deliver(bridge, subscription, &message, retry, &mut shutdown).await {
            info!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "shutdown during retry; message left unacknowledged"
            );
            return Ok(());
        }
    }
}

/// Process one message until it is settled. Returns false if shutdown
/// interrupted the retries.
async fn deliver<S, F>(
    bridge: &MessageBridge,
    subscription: &mut S,
    message: &InboundMessage,
    retry: RetryPolicy,
    shutdown: &mut Pin<&mut F>,
) -> bool
where
    S: Subscription,
    F: Future<Output = ()>,
{
    let mut attempt = 0u32;
    loop {
        let settled = match bridge.process(message).await {
            Outcome::Ack => true,
            Outcome::Nack(reason) => match subscription.dead_letter(message, &reason).await {
                Ok(()) => true,
                Err(e) => {
                    error!(
                        offset = message.offset,
                        error = %e,
                        "dead-lettering failed; will retry"
                    );
                    false
                }
            },
            Outcome::Retry => false,
        };

        if settled {
            // A lost ack only means a redelivery, which the upsert absorbs.
            if let Err(e) = subscription.ack(message).await {
                warn!(offset = message.offset, error = %e, "ack failed");
            }
            return true;
        }

        let delay = retry.backoff(attempt);
        attempt = attempt.saturating_add(1);
        debug!(offset = message.offset, attempt, delay_ms = delay.as_millis() as u64, "retrying message");
        if interrupted(shutdown, delay).await {
            return false;
        }
    }
}

/// Sleep for `delay`; true if shutdown fired first.
async fn interrupted<F: Future<Output = ()>>(shutdown: &mut Pin<&mut F>, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.as_mut() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
