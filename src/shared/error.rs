//! Sync Error Types
//!
//! This module defines the single error type used across the offline engine.
//!
//! # Error Categories
//!
//! - `Network` / `Status` - transport failures and non-success HTTP responses
//! - `Rejected` - the server refused a write for a non-connectivity reason
//! - `Storage` / `Serialization` - local persistence failures
//! - `StaleSnapshot` - a snapshot older than the persisted one
//! - `InvalidInput` - caller passed a malformed value
//! - `Config` - configuration could not be built
//!
//! # Connectivity classification
//!
//! Callers rarely match on variants directly. The engine only asks one
//! question, [`SyncError::is_connectivity`]: connectivity-class failures degrade
//! to offline behavior (cache read, queue enqueue) and are never shown to the
//! user, everything else is reported upstream.
//!
//! # Usage
//!
//! ```rust
//! use journey_sync::shared::error::SyncError;
//!
//! let error = SyncError::invalid_input("businessId", "must not be empty");
//! assert!(!error.is_connectivity());
//! ```
use crate::shared::config::ConfigError;
use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used by the whole crate
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors produced by the offline sync engine
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport error or timeout while talking to the server
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status returned by the server
        status: StatusCode,
        /// Response body, possibly empty
        body: String,
    },

    /// The server refused the write for a reason retrying will not fix
    #[error("Rejected by server ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the server
        status: StatusCode,
        /// Server-provided error message
        message: String,
    },

    /// Local database failure
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// JSON serialization or deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot older than the persisted one was offered for writing
    #[error("Stale snapshot: persisted version {current}, incoming version {incoming}")]
    StaleSnapshot {
        /// Version currently persisted
        current: i64,
        /// Version that was rejected
        incoming: i64,
    },

    /// Caller supplied an invalid value
    #[error("Invalid input in field '{field}': {message}")]
    InvalidInput {
        /// The offending field
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Configuration could not be built
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Create a new invalid input error
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a status error from a response status and body
    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Whether this failure means "the server could not be reached or could
    /// not take the write right now".
    ///
    /// Transport errors, timeouts, 5xx, 408 and 429 count as connectivity.
    /// Any other 4xx is a rejection and is reported upstream.
    pub fn is_connectivity(&self) -> bool {
        match self {
            SyncError::Network(_) => true,
            SyncError::Status { status, .. } => status_is_connectivity(*status),
            _ => false,
        }
    }

    /// Turn a non-connectivity status failure into a [`SyncError::Rejected`]
    pub fn into_rejection(self) -> Self {
        match self {
            SyncError::Status { status, body } if !status_is_connectivity(status) => {
                SyncError::Rejected {
                    status,
                    message: extract_error_message(&body),
                }
            }
            other => other,
        }
    }
}

fn status_is_connectivity(status: StatusCode) -> bool {
    !status.is_client_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// Pull `{"error": "..."}` out of a body, falling back to the raw text
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
