//! Application configuration module
//!
//! Provides the validated settings the sync engine runs with. Values are
//! assembled through [`AppConfigBuilder`], which is the only place that checks
//! them; everything downstream can assume a well-formed URL and non-zero
//! timeouts.

use reqwest::Url;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Validated application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the REST API, without a trailing slash
    pub server_url: String,
    /// Location of the local SQLite file
    pub db_path: PathBuf,
    /// Delay between two connectivity probes
    pub probe_interval: Duration,
    /// Hard deadline of a single connectivity probe
    pub probe_timeout: Duration,
    /// Deadline for mutation writes and snapshot fetches
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// Builder for AppConfig
#[derive(Debug, Default, Clone)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    db_path: Option<PathBuf>,
    probe_interval: Option<Duration>,
    probe_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the local database path
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Set the probe interval
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = Some(interval);
        self
    }

    /// Set the probe deadline
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Set the request deadline
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Overlay values from a parsed config file; values already set win
    pub fn merge_file(mut self, file: FileConfig) -> Self {
        self.server_url = self.server_url.or(file.server_url);
        self.db_path = self.db_path.or(file.db_path);
        self.probe_interval = self
            .probe_interval
            .or(file.probe_interval_secs.map(Duration::from_secs));
        self.probe_timeout = self
            .probe_timeout
            .or(file.probe_timeout_secs.map(Duration::from_secs));
        self.request_timeout = self
            .request_timeout
            .or(file.request_timeout_secs.map(Duration::from_secs));
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let server_url = self.server_url.ok_or(ConfigError::MissingValue("server_url"))?;
        let parsed = Url::parse(&server_url).map_err(|_| ConfigError::InvalidUrl(server_url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(server_url));
        }

        let db_path = self.db_path.ok_or(ConfigError::MissingValue("db_path"))?;
        let probe_interval = non_zero("probe_interval", self.probe_interval)?;
        let probe_timeout = non_zero("probe_timeout", self.probe_timeout)?;
        let request_timeout = non_zero("request_timeout", self.request_timeout)?;

        Ok(AppConfig {
            server_url: server_url.trim_end_matches('/').to_string(),
            db_path,
            probe_interval,
            probe_timeout,
            request_timeout,
        })
    }
}

fn non_zero(name: &'static str, value: Option<Duration>) -> Result<Duration, ConfigError> {
    match value {
        None => Err(ConfigError::MissingValue(name)),
        Some(d) if d.is_zero() => Err(ConfigError::ZeroDuration(name)),
        Some(d) => Ok(d),
    }
}

/// On-disk TOML representation; every key is optional
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub db_path: Option<PathBuf>,
    pub probe_interval_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("could not parse config file: {0}")]
    Parse(String),
    #[error("could not read config file {path}: {message}")]
    Io { path: String, message: String },
}
