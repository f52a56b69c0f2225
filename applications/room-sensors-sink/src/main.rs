use room_sensors::config::config_path;
use room_sensors::shutdown::shutdown_signal;
use room_sensors::{TimeSeriesGateway, TimescaleStore};
use room_sensors_sink::redpanda::KafkaSubscription;
use room_sensors_sink::{run, Config, MessageBridge};
use std::sync::Arc;
use tracing::info;
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
    let cfg = Config::load(&cfg_path)?;
    info!(topic = %cfg.redpanda.topic, "loaded config");

    let store = TimescaleStore::connect(&cfg.database).await?;
    store.ping().await?;
    info!("connected to database");
    if cfg.init_schema {
        store.ensure_schema().await?;
    }

    let mut subscription = KafkaSubscription::connect(&cfg.redpanda)?;
    let bridge = MessageBridge::new(TimeSeriesGateway::new(Arc::new(store.clone())));

    run(&bridge, &mut subscription, cfg.retry.policy(), shutdown_signal()).await?;

    store.close().await;
    info!("sink stopped");
    Ok(())
}
