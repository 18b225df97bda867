//! Server configuration.
//!
//! Loaded from a JSON file with sensible defaults; host, port, and
//! database path can be overridden through the environment.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Main server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite file. Empty means the platform default
    /// (`~/.valuflow/data/valuflow.db`).
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            database: DatabaseSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Applies environment overrides: `VALUFLOW_HOST`, `VALUFLOW_PORT`,
    /// `VALUFLOW_DB_PATH`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("VALUFLOW_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("VALUFLOW_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => log::warn!("Ignoring invalid VALUFLOW_PORT '{}'", port),
            }
        }
        if let Ok(path) = std::env::var("VALUFLOW_DB_PATH") {
            self.database.path = path;
        }
    }

    /// Resolves the database path, falling back to the platform default.
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.database.path.is_empty() {
            valuflow::db::default_database_path()
        } else {
            Some(PathBuf::from(&self.database.path))
        }
    }
}
