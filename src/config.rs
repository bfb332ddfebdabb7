// ⚙️ Application configuration (TOML)
//
// Every section is optional; a missing file means "all defaults".
//
//   [server]
//   bind_address = "0.0.0.0"
//   port = 2022
//
//   [database]
//   path = "./data/ev_value.db"
//
//   [estimation]
//   window_size = 24
//   day_ahead_share = 0.20
//   [estimation.default_prices]
//   day_ahead = 50.0

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result, ValidationError};
use crate::estimator::EstimatorConfig;

/// Overrides `[database] path` when set
pub const DB_PATH_ENV: &str = "EV_VALUE_DB";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub estimation: EstimatorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    2022
}

fn default_db_path() -> String {
    "./data/ev_value.db".to_owned()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::invalid("config", e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Read `path` if it exists, fall back to defaults otherwise, then apply
    /// environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
            if !db_path.trim().is_empty() {
                config.database.path = db_path;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.server.port == 0 {
            return Err(ValidationError::new("server.port", "must be non-zero"));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(ValidationError::new("server.bind_address", "must be set"));
        }
        if self.database.path.trim().is_empty() {
            return Err(ValidationError::new("database.path", "must be set"));
        }
        self.estimation.validate()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
