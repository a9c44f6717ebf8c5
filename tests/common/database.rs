//! Database test fixtures
//!
//! Every fixture lives in its own temporary directory so tests can run in
//! parallel and reopen the same file.

use journey_sync::local_db::LocalDatabase;
use std::path::PathBuf;
use tempfile::TempDir;

/// SQLite file in a temporary directory, removed on drop
pub struct TestDatabase {
    pub db: LocalDatabase,
    pub path: PathBuf,
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("offline.db");
        let db = LocalDatabase::open(&path)
            .await
            .expect("Failed to open test database");
        Self { db, path, _dir: dir }
    }

    /// Open a second handle on the same file
    pub async fn reopen(&self) -> LocalDatabase {
        LocalDatabase::open(&self.path)
            .await
            .expect("Failed to reopen test database")
    }
}
