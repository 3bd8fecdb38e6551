//! Server configuration.
//!
//! Read from a TOML file (`shelter.toml` unless `SHELTER_CONFIG` points
//! elsewhere). Every field has a default, so a missing file or a partial
//! one is fine. `SHELTER_BIND`, `SHELTER_DATABASE_URL` and
//! `SHELTER_DATA_DIR` override the file.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIG_PATH: &str = "shelter.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    /// Catalog root with `materials/`, `modules/` and `traders/`
    pub data_dir: PathBuf,
    /// Image for materials no requirement mentions
    pub fallback_image: String,
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            database_url: "sqlite:shelter.db?mode=rwc".to_string(),
            max_connections: 5,
            data_dir: PathBuf::from("data"),
            fallback_image: "unknown.png".to_string(),
            log_filter: "shelter_tracker=info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
        Self::from_toml(&content).map_err(|e| format!("Failed to parse {:?}: {}", path, e))
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load using `SHELTER_CONFIG` and apply environment overrides
    pub fn from_env() -> Result<Self, String> {
        let path = std::env::var("SHELTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// `RUST_LOG` when set and valid, otherwise `log_filter`
    pub fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&self.log_filter))
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), String> {
        if let Some(bind) = lookup("SHELTER_BIND") {
            self.bind_addr = bind
                .parse()
                .map_err(|e| format!("Invalid SHELTER_BIND '{}': {}", bind, e))?;
        }
        if let Some(url) = lookup("SHELTER_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(dir) = lookup("SHELTER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}
