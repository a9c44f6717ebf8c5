//! Database Schema Definitions
//!
//! The store is a single key-value table. Values are JSON documents; the
//! keys below are the only ones the engine writes.

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Schema migration versions
pub const MIGRATION_VERSIONS: &[i32] = &[1];

/// Last server snapshot
pub const OFFLINE_CACHE_KEY: &str = "offlineCache";

/// Ordered list of pending mutations
pub const PENDING_MUTATIONS_KEY: &str = "pendingMutations";

/// Locally generated user id
pub const USER_ID_KEY: &str = "userId";

pub(crate) const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
)";

pub(crate) const CREATE_KV_STORE: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Check if database needs migration
pub fn needs_migration(current_version: i32) -> bool {
    current_version < CURRENT_SCHEMA_VERSION
}

/// Get pending migrations
pub fn get_pending_migrations(current_version: i32) -> Vec<i32> {
    MIGRATION_VERSIONS
        .iter()
        .filter(|&&v| v > current_version)
        .cloned()
        .collect()
}
