//! # Sync State Management
//!
//! `SyncState` is what the reconciliation engine updates while it works;
//! `SyncStatus` is the read-only summary handed to the UI.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub is_syncing: bool,
    /// Last time a snapshot was refreshed
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Storage error that ended the last drain, if any
    pub last_error: Option<String>,
}

/// Snapshot of everything the UI shows about syncing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub pending_mutations: usize,
    pub snapshot_version: Option<i64>,
}
