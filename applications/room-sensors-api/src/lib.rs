pub mod api;
pub mod auth;
pub mod config;
pub mod error;

use auth::{AllowList, AuthGate, SessionIdentity};
use config::Config;
use room_sensors::TimeSeriesGateway;
use std::sync::Arc;

// Re-export commonly used items
pub use api::{create_router, AppState, Site};
pub use error::ApiError;

/// Assemble the shared request state from the configuration.
pub fn build_state(cfg: &Config, gateway: TimeSeriesGateway) -> AppState {
    let sessions = Arc::new(SessionIdentity::new(
        &cfg.auth.session_secret,
        chrono::Duration::hours(cfg.auth.session_ttl_hours),
        cfg.api.base_url.starts_with("https://"),
    ));

    AppState {
        gateway,
        auth: AuthGate::new(AllowList::new(&cfg.auth.allowed_emails), sessions.clone()),
        sessions,
        site: Arc::new(Site {
            base_url: cfg.api.base_url.clone(),
            login_path: cfg.auth.login_path.clone(),
            index_file: cfg.assets.index_file.clone(),
        }),
    }
}
