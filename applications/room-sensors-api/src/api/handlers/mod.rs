pub mod auth;
pub mod data;
pub mod health;
pub mod index;

use crate::auth::{AuthGate, SessionIdentity};
use room_sensors::TimeSeriesGateway;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the browser is sent and what it is served.
#[derive(Debug, Clone)]
pub struct Site {
    pub base_url: String,
    pub login_path: String,
    pub index_file: PathBuf,
}

impl Site {
    /// Login entry point of the authenticating proxy, returning to the
    /// session callback afterwards.
    pub fn login_url(&self) -> String {
        format!(
            "{base}{login}?rd={base}/auth/callback",
            base = self.base_url,
            login = self.login_path
        )
    }
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: TimeSeriesGateway,
    pub auth: AuthGate,
    pub sessions: Arc<SessionIdentity>,
    pub site: Arc<Site>,
}
