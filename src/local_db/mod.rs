//! # Local Database Module
//!
//! SQLite-backed key-value store for everything the client keeps across
//! restarts: the last server snapshot, the pending mutation queue and the
//! locally generated user id.
//!
//! ## Architecture
//!
//! - **`LocalDatabase`**: connection pool, schema and migrations
//! - **`KvWriter`**: scoped writer; holds the in-process write gate and a
//!   SQLite transaction. Nothing is visible to readers until
//!   [`KvWriter::commit`]; dropping the writer rolls back.
//! - **`cache.rs`**: the `offlineCache` snapshot
//! - **`identity.rs`**: the `userId` key
//!
//! The pending mutation queue lives in [`crate::offline::queue`] and writes
//! through the same gate.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use journey_sync::local_db::LocalDatabase;
//!
//! # async fn example() -> journey_sync::shared::Result<()> {
//! let db = LocalDatabase::in_memory().await?;
//!
//! let mut writer = db.writer().await?;
//! writer.put("userId", "user_1700000000000").await?;
//! writer.commit().await?;
//!
//! assert_eq!(db.get("userId").await?.as_deref(), Some("user_1700000000000"));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod identity;
pub mod schema;

pub use cache::LocalCacheStore;
pub use identity::UserIdentity;

use crate::shared::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Local database connection manager
///
/// Cheap to clone; clones share the pool and the write gate.
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
    write_gate: Arc<Mutex<()>>,
}

impl LocalDatabase {
    /// Open or create the database file at `path`
    ///
    /// Creates parent directories as needed. Uses WAL mode so readers never
    /// block on an open write transaction.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "Opened local database");
        Self::with_pool(pool).await
    }

    /// Private in-memory database, used by tests and ephemeral sessions
    ///
    /// Pinned to one connection that is never recycled; a second connection
    /// would see a different, empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self {
            pool,
            write_gate: Arc::new(Mutex::new(())),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Apply any pending schema migrations
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(schema::CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        let current_version: (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        if !schema::needs_migration(current_version.0) {
            return Ok(());
        }

        for version in schema::get_pending_migrations(current_version.0) {
            let mut tx = self.pool.begin().await?;
            if version == 1 {
                sqlx::query(schema::CREATE_KV_STORE).execute(&mut *tx).await?;
            }
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            tracing::info!(version, "Applied local schema migration");
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read the committed value of `key`
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Acquire the write gate and open a transaction
    ///
    /// Only one writer exists at a time across every clone of this database.
    /// Do not call [`LocalDatabase::get`] while holding a writer: in-memory
    /// databases have a single connection and the writer owns it. Read
    /// through [`KvWriter::get`] instead.
    pub async fn writer(&self) -> Result<KvWriter> {
        let gate = Arc::clone(&self.write_gate).lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(KvWriter { tx, _gate: gate })
    }
}

/// Scoped writer over the key-value table
///
/// Rolls back and releases the gate when dropped without [`KvWriter::commit`].
pub struct KvWriter {
    tx: Transaction<'static, Sqlite>,
    _gate: OwnedMutexGuard<()>,
}

impl KvWriter {
    /// Read `key` as seen by this transaction
    pub async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(value)
    }

    /// Insert or replace `key`
    pub async fn put(&mut self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Remove `key`; a missing key is not an error
    pub async fn delete(&mut self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// Make every change visible at once and release the gate
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
