use room_sensors::config::config_path;
use room_sensors::shutdown::shutdown_signal;
use room_sensors::{TimeSeriesGateway, TimescaleStore};
use room_sensors_api::config::Config;
use room_sensors_api::{build_state, create_router};
use std::sync::Arc;
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
    let cfg = Config::load(&cfg_path)?;
    info!(
        base_url = %cfg.api.base_url,
        allowed_emails = cfg.auth.allowed_emails.len(),
        "loaded config"
    );
    if cfg.auth.allowed_emails.is_empty() {
        warn!("allow-list is empty; every data request will be refused");
    }

    let store = TimescaleStore::connect(&cfg.database).await?;
    store.ping().await?;
    info!("connected to database");

    let state = build_state(&cfg, TimeSeriesGateway::new(Arc::new(store.clone())));
    let app = create_router(state, &cfg.assets.dir);

    let bind_addr = cfg.api.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("API server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("API server stopped");
    Ok(())
}
