use crate::credentials::Credential;
use crate::error::AgentError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

// The device bridge speaks MQTT 3.1.1, so this uses the v4 API surface.
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, Transport};

/// Publishing side of a broker session.
///
/// `connect` always opens a brand new session authenticated with the given
/// credential; a previous session is dropped first.
#[async_trait]
pub trait Broker: Send {
    async fn connect(&mut self, credential: &Credential) -> Result<(), AgentError>;

    /// Fire-and-forget publish (QoS 0).
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), AgentError>;

    /// Drive the session. Resolves on each network event; never resolves while
    /// disconnected. An error means the session is gone.
    async fn poll(&mut self) -> Result<(), AgentError>;

    async fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    /// The password is a bearer token; only disable for a local test broker.
    pub tls: bool,
}

impl MqttSettings {
    fn options(&self, credential: &Credential) -> MqttOptions {
        let mut opts = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        opts.set_keep_alive(self.keep_alive);
        opts.set_clean_session(true);
        // The bridge ignores the username; the token goes in the password.
        opts.set_credentials("unused", credential.token.clone());
        if self.tls {
            opts.set_transport(Transport::tls_with_default_config());
        }
        opts
    }
}

struct Session {
    client: AsyncClient,
    eventloop: EventLoop,
}

pub struct MqttBroker {
    settings: MqttSettings,
    session: Option<Session>,
}

impl MqttBroker {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            session: None,
        }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), AgentError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(AgentError::Mqtt(format!("connection refused: {:?}", code))),
                };
            }
            Ok(_) => continue,
            Err(e) => return Err(AgentError::Mqtt(e.to_string())),
        }
    }
}

#[async_trait]
impl Broker for MqttBroker {
    async fn connect(&mut self, credential: &Credential) -> Result<(), AgentError> {
        self.disconnect().await;

        let (client, mut eventloop) = AsyncClient::new(self.settings.options(credential), 10);
        let timeout = self.settings.connect_timeout;
        // On any failure the event loop is dropped here, so a rejected or
        // stale credential is never retried by the client on its own.
        tokio::time::timeout(timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| AgentError::ConnectTimeout(timeout))??;

        info!(
            host = %self.settings.host,
            port = self.settings.port,
            client_id = %self.settings.client_id,
            "connected to MQTT bridge"
        );
        self.session = Some(Session { client, eventloop });
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), AgentError> {
        let session = self.session.as_ref().ok_or(AgentError::NotConnected)?;
        let result = session
            .client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await;
        if let Err(e) = result {
            self.session = None;
            return Err(AgentError::Mqtt(e.to_string()));
        }
        Ok(())
    }

    async fn poll(&mut self) -> Result<(), AgentError> {
        let Some(session) = self.session.as_mut() else {
            return std::future::pending().await;
        };
        let result = session.eventloop.poll().await;
        match result {
            Ok(event) => {
                debug!(?event, "mqtt event");
                Ok(())
            }
            Err(e) => {
                self.session = None;
                Err(AgentError::Mqtt(e.to_string()))
            }
        }
    }

    async fn disconnect(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if session.client.disconnect().await.is_ok() {
            // Flush the DISCONNECT packet; the loop errors out once it is sent.
            let _ = tokio::time::timeout(Duration::from_secs(1), async {
                while session.eventloop.poll().await.is_ok() {}
            })
            .await;
        }
        debug!("mqtt session closed");
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn settings(port: u16) -> MqttSettings {
        MqttSettings {
            host: "127.0.0.1".into(),
            port,
            client_id: "projects/p/locations/r/registries/g/devices/d".into(),
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_millis(500),
            tls: true,
        }
    }

    fn credential() -> Credential {
        let now = Utc::now();
        Credential {
            token: "header.claims.signature".into(),
            issued_at: now,
            expires_at: now + chrono::Duration::minutes(20),
        }
    }

    #[test]
    fn test_options_carry_credential() {
        let opts = settings(1883).options(&credential());
        assert_eq!(opts.client_id(), "projects/p/locations/r/registries/g/devices/d");
        assert_eq!(
            opts.credentials(),
            Some(("unused".to_string(), "header.claims.signature".to_string()))
        );
        assert!(opts.clean_session());
    }

    #[test]
    fn test_tls_does_not_depend_on_port() {
        for port in [8883, 443, 1883] {
            let opts = settings(port).options(&credential());
            assert!(matches!(opts.transport(), Transport::Tls(_)), "port {port}");
        }
    }

    #[test]
    fn test_plain_tcp_only_when_disabled() {
        let mut plain = settings(1883);
        plain.tls = false;
        assert!(matches!(plain.options(&credential()).transport(), Transport::Tcp));
    }

    #[tokio::test]
    async fn test_publish_without_session() {
        let mut broker = MqttBroker::new(settings(1883));
        assert!(!broker.is_connected());
        let err = broker.publish("/devices/d/state", b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, AgentError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_no_session() {
        // Nothing listens on port 1 locally.
        let mut broker = MqttBroker::new(settings(1));
        assert!(broker.connect(&credential()).await.is_err());
        assert!(!broker.is_connected());
    }
}
