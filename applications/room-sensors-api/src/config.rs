use anyhow::bail;
use room_sensors::config::env_override;
use room_sensors::timescale::DbConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DbConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub base_url: String,
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub allowed_emails: Vec<String>,
    #[serde(default)]
    pub session_secret: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_login_path")]
    pub login_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    #[serde(default = "default_assets_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
            index_file: default_index_file(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_session_ttl_hours() -> i64 {
    24 * 7
}
fn default_login_path() -> String {
    "/oauth2/start".into()
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("./assets")
}
fn default_index_file() -> PathBuf {
    PathBuf::from("./index.html")
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
        if let Some(secret) = env_override("SESSION_SECRET") {
            self.auth.session_secret = secret;
        }
        if let Some(emails) = env_override("ALLOWED_EMAILS") {
            self.auth.allowed_emails = emails
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect();
        }
        self.api.base_url = self.api.base_url.trim_end_matches('/').to_string();
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            bail!("api.base_url must be an absolute http(s) URL");
        }
        if !self.auth.login_path.starts_with('/') {
            bail!("auth.login_path must start with '/'");
        }
        if self.auth.session_secret.trim().is_empty() {
            bail!("auth.session_secret is required (or set SESSION_SECRET)");
        }
        if self.auth.session_ttl_hours <= 0 {
            bail!("auth.session_ttl_hours must be positive");
        }
        Ok(())
    }
}
