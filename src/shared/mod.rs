//! Shared Module
//!
//! Types shared by every layer of the engine: the error type, validated
//! configuration, the opaque server entities and the pending mutation model.
//! All of them are plain serializable data with no I/O attached.

/// Sync error types
pub mod error;

/// Application configuration
pub mod config;

/// Server entities and cache snapshots
pub mod entity;

/// Pending mutation model and wire format
pub mod mutation;

pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use entity::{CacheSnapshot, Entity, EntityKind};
pub use error::{Result, SyncError};
pub use mutation::{MutationAction, MutationPayload, MutationType, PendingMutation};
