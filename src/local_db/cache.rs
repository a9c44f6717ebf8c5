//! # Local Cache Store
//!
//! Holds the last [`CacheSnapshot`] received from the server under the
//! `offlineCache` key. Snapshots are replaced wholesale, never merged, and
//! their version never goes backwards.

use super::schema::{OFFLINE_CACHE_KEY, PENDING_MUTATIONS_KEY};
use super::LocalDatabase;
use crate::shared::entity::CacheSnapshot;
use crate::shared::error::{Result, SyncError};

/// Snapshot persistence over the key-value table
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    db: LocalDatabase,
}

impl LocalCacheStore {
    pub fn new(db: LocalDatabase) -> Self {
        Self { db }
    }

    /// Replace the persisted snapshot
    ///
    /// Readers see either the previous snapshot or this one. A snapshot whose
    /// version is lower than the persisted one is refused with
    /// [`SyncError::StaleSnapshot`] and nothing is written.
    pub async fn write(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let encoded = serde_json::to_string(snapshot)?;
        let mut writer = self.db.writer().await?;

        let current = writer.get(OFFLINE_CACHE_KEY).await?.and_then(|raw| decode(&raw));
        if let Some(current) = current {
            if snapshot.version < current.version {
                tracing::warn!(
                    current = current.version,
                    incoming = snapshot.version,
                    "Refusing stale snapshot"
                );
                return Err(SyncError::StaleSnapshot {
                    current: current.version,
                    incoming: snapshot.version,
                });
            }
        }

        writer.put(OFFLINE_CACHE_KEY, &encoded).await?;
        writer.commit().await?;

        tracing::debug!(version = snapshot.version, "Snapshot written");
        Ok(())
    }

    /// Latest snapshot, `None` when absent or unreadable
    pub async fn read(&self) -> Option<CacheSnapshot> {
        match self.db.get(OFFLINE_CACHE_KEY).await {
            Ok(raw) => raw.and_then(|raw| decode(&raw)),
            Err(e) => {
                tracing::error!("Failed to read cached snapshot: {}", e);
                None
            }
        }
    }

    /// Version of the persisted snapshot
    pub async fn version(&self) -> Option<i64> {
        self.read().await.map(|s| s.version)
    }

    /// Remove the snapshot and the pending mutation queue together
    ///
    /// The user id survives.
    pub async fn clear(&self) -> Result<()> {
        let mut writer = self.db.writer().await?;
        writer.delete(OFFLINE_CACHE_KEY).await?;
        writer.delete(PENDING_MUTATIONS_KEY).await?;
        writer.commit().await?;

        tracing::info!("Offline cache and pending mutations cleared");
        Ok(())
    }
}

fn decode(raw: &str) -> Option<CacheSnapshot> {
    match serde_json::from_str(raw) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!("Ignoring corrupt cached snapshot: {}", e);
            None
        }
    }
}
