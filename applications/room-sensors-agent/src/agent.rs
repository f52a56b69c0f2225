use crate::credentials::CredentialProvider;
use crate::error::AgentError;
use crate::mqtt::Broker;
use crate::sensor::Sensor;
use chrono::{DateTime, Utc};
use room_sensors::Sample;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Disconnected,
    Connecting,
    Connected,
    Sampling,
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub room: String,
    pub topic: String,
    pub sample_interval: Duration,
    /// Reconnect with a fresh credential this long before the current one expires.
    pub refresh_margin: chrono::Duration,
}

/// Samples the room sensor on a fixed cadence and publishes each reading
/// over a broker session authenticated with short-lived credentials.
pub struct DeviceAgent<S, B> {
    settings: AgentSettings,
    credentials: CredentialProvider,
    sensor: S,
    broker: B,
    state: AgentState,
    credential_expires_at: Option<DateTime<Utc>>,
}

impl<S: Sensor, B: Broker> DeviceAgent<S, B> {
    pub fn new(settings: AgentSettings, credentials: CredentialProvider, sensor: S, broker: B) -> Self {
        Self {
            settings,
            credentials,
            sensor,
            broker,
            state: AgentState::Disconnected,
            credential_expires_at: None,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Mint a fresh credential and open a new broker session with it.
    pub async fn connect(&mut self, now: DateTime<Utc>) -> Result<(), AgentError> {
        self.state = AgentState::Connecting;
        let result = self.open_session(now).await;
        self.state = match result {
            Ok(()) => AgentState::Connected,
            Err(_) => AgentState::Disconnected,
        };
        result
    }

    async fn open_session(&mut self, now: DateTime<Utc>) -> Result<(), AgentError> {
        let credential = self.credentials.mint_at(now)?;
        self.broker.connect(&credential).await?;
        info!(expires_at = %credential.expires_at, "broker session established");
        self.credential_expires_at = Some(credential.expires_at);
        Ok(())
    }

    fn needs_reconnect(&self, now: DateTime<Utc>) -> bool {
        if !self.broker.is_connected() {
            return true;
        }
        match self.credential_expires_at {
            Some(expires_at) => expires_at - self.settings.refresh_margin <= now,
            None => true,
        }
    }

    /// One sampling cycle: refresh the session if needed, then read and publish.
    ///
    /// Errors are per-cycle; the caller logs them and carries on with the next tick.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<(), AgentError> {
        if self.needs_reconnect(now) {
            if self.broker.is_connected() {
                info!("credential about to expire; reconnecting");
                self.broker.disconnect().await;
            }
            self.state = AgentState::Disconnected;
            self.connect(now).await?;
        }

        self.state = AgentState::Sampling;
        let result = self.sample_and_publish(now).await;
        self.state = AgentState::Connected;
        result
    }

    async fn sample_and_publish(&mut self, now: DateTime<Utc>) -> Result<(), AgentError> {
        let reading = self.sensor.read()?;
        let sample = Sample {
            room: self.settings.room.clone(),
            temperature: reading.temperature,
            pressure: reading.pressure,
            humidity: reading.humidity,
            observed_at: now,
        };
        let payload = sample.payload().to_vec()?;
        self.broker.publish(&self.settings.topic, payload).await?;
        debug!(
            room = %sample.room,
            temperature = sample.temperature,
            pressure = sample.pressure,
            humidity = sample.humidity,
            "sample published"
        );
        Ok(())
    }

    /// Connect, then sample every interval until `shutdown` resolves.
    ///
    /// Failing to establish the first session is fatal. After that, every
    /// failure is logged and retried on the next tick.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<(), AgentError> {
        if let Err(e) = self.connect(Utc::now()).await {
            error!(error = %e, "initial broker connection failed");
            return Err(e);
        }

        let mut ticker = tokio::time::interval(self.settings.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        warn!(error = %e, "sampling cycle failed");
                    }
                }
                res = self.broker.poll() => {
                    if let Err(e) = res {
                        warn!(error = %e, "broker session lost; reconnecting on next tick");
                        self.state = AgentState::Disconnected;
                    }
                }
            }
        }

        self.broker.disconnect().await;
        self.state = AgentState::Disconnected;
        Ok(())
    }
}
