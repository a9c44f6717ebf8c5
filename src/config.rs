//! Runtime configuration
//!
//! Wraps [`AppConfig`] with the defaults the client ships with and the
//! environment overrides the daemon reads. Precedence is environment, then
//! the optional TOML file named by `JOURNEY_CONFIG`, then defaults.

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError, FileConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Application configuration wrapper.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Build from the process environment and the optional config file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = AppConfig::builder();

        if let Ok(url) = std::env::var("JOURNEY_API_URL") {
            builder = builder.server_url(url);
        }
        if let Ok(path) = std::env::var("JOURNEY_DB_PATH") {
            builder = builder.db_path(path);
        }
        if let Some(secs) = env_secs("JOURNEY_PROBE_INTERVAL_SECS")? {
            builder = builder.probe_interval(secs);
        }
        if let Some(secs) = env_secs("JOURNEY_PROBE_TIMEOUT_SECS")? {
            builder = builder.probe_timeout(secs);
        }
        if let Some(secs) = env_secs("JOURNEY_REQUEST_TIMEOUT_SECS")? {
            builder = builder.request_timeout(secs);
        }
        if let Ok(file) = std::env::var("JOURNEY_CONFIG") {
            builder = builder.merge_file(read_file(Path::new(&file))?);
        }

        Self::with_builder(builder)
    }

    /// Build from an explicit builder, filling anything unset with defaults
    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let defaults = FileConfig {
            server_url: Some(DEFAULT_SERVER_URL.to_string()),
            db_path: Some(default_db_path()),
            probe_interval_secs: Some(DEFAULT_PROBE_INTERVAL.as_secs()),
            probe_timeout_secs: Some(DEFAULT_PROBE_TIMEOUT.as_secs()),
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT.as_secs()),
        };
        let app = builder.merge_file(defaults).build()?;
        Ok(Self { app })
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn db_path(&self) -> &Path {
        &self.app.db_path
    }

    pub fn probe_interval(&self) -> Duration {
        self.app.probe_interval
    }

    pub fn probe_timeout(&self) -> Duration {
        self.app.probe_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.app.request_timeout
    }
}

/// Platform data directory, falling back to the temp dir
fn default_db_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("journey-sync");
    path.push("offline.db");
    path
}

fn env_secs(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::Parse(format!("{name}={raw} is not a number of seconds"))),
        Err(_) => Ok(None),
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    FileConfig::from_toml(&text)
}
