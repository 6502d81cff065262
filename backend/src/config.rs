//! Server configuration: optional YAML file, then environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::storage::db::DATABASE_URL;

pub const CONFIG_PATH_ENV: &str = "BRAINQUEST_CONFIG";
pub const BIND_ADDR_ENV: &str = "BRAINQUEST_BIND_ADDR";
pub const ACCESS_TOKEN_ENV: &str = "BRAINQUEST_ACCESS_TOKEN";
pub const DATABASE_URL_ENV: &str = "BRAINQUEST_DATABASE_URL";
pub const PURGE_INTERVAL_ENV: &str = "BRAINQUEST_PURGE_INTERVAL_SECS";
pub const CORS_ORIGIN_ENV: &str = "BRAINQUEST_CORS_ORIGIN";

pub const DEFAULT_ACCESS_TOKEN: &str = "dev-token";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Shared bearer token every client sends
    pub access_token: String,
    /// `sqlite:` URL, or `memory` for the in-process store
    pub database_url: String,
    /// Seconds between expiry sweeps; 0 disables the sweeper
    pub purge_interval_secs: u64,
    /// Allowed origin, `*` for any
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            access_token: DEFAULT_ACCESS_TOKEN.to_string(),
            database_url: DATABASE_URL.to_string(),
            purge_interval_secs: 600,
            cors_origin: "*".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from `$BRAINQUEST_CONFIG` (if set), then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;

        if config.access_token == DEFAULT_ACCESS_TOKEN {
            warn!("Using the default access token; set {} in production", ACCESS_TOKEN_ENV);
        }
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded server config from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(BIND_ADDR_ENV) {
            self.bind_addr = value;
        }
        if let Some(value) = lookup(ACCESS_TOKEN_ENV) {
            self.access_token = value;
        }
        if let Some(value) = lookup(DATABASE_URL_ENV) {
            self.database_url = value;
        }
        if let Some(value) = lookup(PURGE_INTERVAL_ENV) {
            self.purge_interval_secs = value
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", PURGE_INTERVAL_ENV))?;
        }
        if let Some(value) = lookup(CORS_ORIGIN_ENV) {
            self.cors_origin = value;
        }
        Ok(())
    }

    pub fn purge_interval(&self) -> Option<Duration> {
        match self.purge_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.database_url, "sqlite:brainquest.db");
        assert_eq!(config.purge_interval(), Some(Duration::from_secs(600)));
        assert_eq!(config.cors_origin, "*");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("server.yaml");
        fs::write(&path, "access_token: secret\npurge_interval_secs: 0\n").unwrap();

        let config = ServerConfig::from_file(&path).unwrap();

        assert_eq!(config.access_token, "secret");
        assert_eq!(config.purge_interval(), None);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (BIND_ADDR_ENV, "127.0.0.1:9000"),
            (DATABASE_URL_ENV, "memory"),
            (PURGE_INTERVAL_ENV, "30"),
        ]);
        let mut config = ServerConfig::default();

        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.database_url, "memory");
        assert_eq!(config.purge_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.access_token, DEFAULT_ACCESS_TOKEN);
    }

    #[test]
    fn test_bad_purge_interval_is_an_error() {
        let mut config = ServerConfig::default();
        let result = config.apply_overrides(|name| (name == PURGE_INTERVAL_ENV).then(|| "soon".to_string()));
        assert!(result.is_err());
    }
}
