use crate::credentials::KeyAlgorithm;
use anyhow::bail;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub sensor: SensorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub project_id: String,
    pub region: String,
    pub registry_id: String,
    pub device_id: String,
    pub private_key_file: PathBuf,
    #[serde(default)]
    pub algorithm: KeyAlgorithm,
}

impl DeviceConfig {
    /// Fully qualified client id the bridge expects for this device.
    pub fn client_id(&self) -> String {
        format!(
            "projects/{}/locations/{}/registries/{}/devices/{}",
            self.project_id, self.region, self.registry_id, self.device_id
        )
    }

    /// Telemetry state topic for this device.
    pub fn state_topic(&self) -> String {
        format!("/devices/{}/state", self.device_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_tls")]
    pub tls: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keep_alive_secs: default_keep_alive_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            tls: default_tls(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_ttl_mins")]
    pub ttl_mins: i64,
    /// Reconnect this long before the token expires.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: i64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            ttl_mins: default_ttl_mins(),
            refresh_margin_secs: default_refresh_margin_secs(),
        }
    }
}

impl CredentialsConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_mins)
    }

    pub fn refresh_margin(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_margin_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    pub room: String,
    #[serde(default = "default_iio_device")]
    pub iio_device: PathBuf,
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
}

impl SensorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }
}

fn default_host() -> String {
    "mqtt.googleapis.com".into()
}
fn default_port() -> u16 {
    8883
}
fn default_keep_alive_secs() -> u64 {
    60
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_tls() -> bool {
    true
}
fn default_ttl_mins() -> i64 {
    20
}
fn default_refresh_margin_secs() -> i64 {
    60
}
fn default_iio_device() -> PathBuf {
    PathBuf::from("/sys/bus/iio/devices/iio:device0")
}
fn default_sample_interval_secs() -> u64 {
    10
}

impl AgentConfig {
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        let cfg: AgentConfig = room_sensors::config::load_yaml(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn parse(raw: &str) -> Result<Self, anyhow::Error> {
        let cfg: AgentConfig = room_sensors::config::parse_yaml(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        for (name, value) in [
            ("device.project_id", &self.device.project_id),
            ("device.region", &self.device.region),
            ("device.registry_id", &self.device.registry_id),
            ("device.device_id", &self.device.device_id),
            ("sensor.room", &self.sensor.room),
        ] {
            if value.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }
        if self.credentials.ttl_mins <= 0 {
            bail!("credentials.ttl_mins must be positive");
        }
        if self.credentials.refresh_margin() >= self.credentials.ttl() {
            bail!("credentials.refresh_margin_secs must be shorter than the token lifetime");
        }
        if self.sensor.sample_interval_secs == 0 {
            bail!("sensor.sample_interval_secs must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const MINIMAL: &str = r#"
device:
  project_id: iot-home
  region: europe-west1
  registry_id: home
  device_id: pi-living
  private_key_file: /etc/room-sensors/rsa_private.pem
sensor:
  room: living
"#;

    #[test]
    fn test_defaults() {
        let cfg = AgentConfig::parse(MINIMAL).unwrap();
        assert_eq!(cfg.mqtt.host, "mqtt.googleapis.com");
        assert_eq!(cfg.mqtt.port, 8883);
        assert_eq!(cfg.mqtt.connect_timeout_secs, 10);
        assert!(cfg.mqtt.tls);
        assert_eq!(cfg.credentials.ttl(), chrono::Duration::minutes(20));
        assert_eq!(cfg.credentials.refresh_margin(), chrono::Duration::seconds(60));
        assert_eq!(cfg.sensor.sample_interval(), Duration::from_secs(10));
        assert_eq!(cfg.device.algorithm, KeyAlgorithm::Rs256);
    }

    #[test]
    fn test_client_id_and_topic() {
        let cfg = AgentConfig::parse(MINIMAL).unwrap();
        assert_eq!(
            cfg.device.client_id(),
            "projects/iot-home/locations/europe-west1/registries/home/devices/pi-living"
        );
        assert_eq!(cfg.device.state_topic(), "/devices/pi-living/state");
    }

    #[test]
    fn test_algorithm_names() {
        let raw = MINIMAL.replace(
            "  private_key_file: /etc/room-sensors/rsa_private.pem",
            "  private_key_file: /etc/room-sensors/ec_private.pem\n  algorithm: ES256",
        );
        let cfg = AgentConfig::parse(&raw).unwrap();
        assert_eq!(cfg.device.algorithm, KeyAlgorithm::Es256);
    }

    #[test]
    fn test_tls_kept_on_other_ports() {
        let raw = format!("{MINIMAL}mqtt:\n  port: 443\n");
        let cfg = AgentConfig::parse(&raw).unwrap();
        assert_eq!(cfg.mqtt.port, 443);
        assert!(cfg.mqtt.tls);
    }

    #[test]
    fn test_rejects_empty_room() {
        let raw = MINIMAL.replace("room: living", "room: \"  \"");
        let err = AgentConfig::parse(&raw).unwrap_err();
        assert!(err.to_string().contains("sensor.room"));
    }

    #[test]
    fn test_rejects_margin_longer_than_ttl() {
        let raw = format!("{MINIMAL}credentials:\n  ttl_mins: 1\n  refresh_margin_secs: 90\n");
        assert!(AgentConfig::parse(&raw).is_err());
    }

    #[test]
    #[serial]
    fn test_env_placeholders() {
        std::env::set_var("TEST_AGENT_ROOM", "bedroom");
        let raw = MINIMAL.replace("room: living", "room: \"${TEST_AGENT_ROOM}\"");
        let cfg = AgentConfig::parse(&raw).unwrap();
        assert_eq!(cfg.sensor.room, "bedroom");
        std::env::remove_var("TEST_AGENT_ROOM");
    }
}
