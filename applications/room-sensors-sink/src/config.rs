use crate::subscription::RetryPolicy;
use anyhow::bail;
use room_sensors::config::env_override;
use room_sensors::timescale::DbConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub redpanda: RedpandaConfig,
    pub database: DbConfig,
    #[serde(default = "default_init_schema")]
    pub init_schema: bool,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedpandaConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    #[serde(default = "default_auto_offset_reset")]
    pub auto_offset_reset: String,
    #[serde(default)]
    pub dead_letter_topic: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

fn default_init_schema() -> bool {
    true
}
fn default_auto_offset_reset() -> String {
    "earliest".into()
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Config {
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let cfg: Config = room_sensors::config::load_yaml(path)?;
        cfg.finish()
    }

    pub fn parse(raw: &str) -> Result<Self, anyhow::Error> {
        let cfg: Config = room_sensors::config::parse_yaml(raw)?;
        cfg.finish()
    }

    fn finish(mut self) -> Result<Self, anyhow::Error> {
        if let Some(url) = env_override("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(brokers) = env_override("REDPANDA_BROKERS") {
            self.redpanda.brokers = brokers;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.redpanda.topic.trim().is_empty() {
            bail!("redpanda.topic must not be empty");
        }
        if self.redpanda.dead_letter_topic.as_deref() == Some(self.redpanda.topic.as_str()) {
            bail!("redpanda.dead_letter_topic must differ from redpanda.topic");
        }
        if !matches!(
            self.redpanda.auto_offset_reset.as_str(),
            "earliest" | "latest" | "none"
        ) {
            bail!(
                "redpanda.auto_offset_reset must be earliest, latest or none (got {})",
                self.redpanda.auto_offset_reset
            );
        }
        if self.retry.initial_backoff_ms == 0 || self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            bail!("retry backoff must be positive and max_backoff_ms >= initial_backoff_ms");
        }
        Ok(())
    }
}
