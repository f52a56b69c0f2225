use room_sensors::config::config_path;
use room_sensors::shutdown::shutdown_signal;
use room_sensors_agent::agent::AgentSettings;
use room_sensors_agent::mqtt::MqttSettings;
use room_sensors_agent::{AgentConfig, CredentialProvider, DeviceAgent, IioSensor, MqttBroker};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let cfg_path = config_path();
    let cfg = AgentConfig::load(&cfg_path)?;
    info!(
        device = %cfg.device.device_id,
        room = %cfg.sensor.room,
        "loaded config"
    );

    let credentials = CredentialProvider::from_pem_file(
        cfg.device.project_id.clone(),
        &cfg.device.private_key_file,
        cfg.device.algorithm,
        cfg.credentials.ttl(),
    )?;
    let sensor = IioSensor::open(&cfg.sensor.iio_device)?;
    info!(device = %sensor.dir().display(), "sensor ready");

    if !cfg.mqtt.tls {
        warn!("mqtt.tls is disabled; credentials are sent in cleartext");
    }
    let broker = MqttBroker::new(MqttSettings {
        host: cfg.mqtt.host.clone(),
        port: cfg.mqtt.port,
        client_id: cfg.device.client_id(),
        keep_alive: Duration::from_secs(cfg.mqtt.keep_alive_secs),
        connect_timeout: Duration::from_secs(cfg.mqtt.connect_timeout_secs),
        tls: cfg.mqtt.tls,
    });
    let settings = AgentSettings {
        room: cfg.sensor.room.clone(),
        topic: cfg.device.state_topic(),
        sample_interval: cfg.sensor.sample_interval(),
        refresh_margin: cfg.credentials.refresh_margin(),
    };

    let agent = DeviceAgent::new(settings, credentials, sensor, broker);
    agent.run(shutdown_signal()).await?;
    info!("agent stopped");
    Ok(())
}
