//! # Offline-First Engine
//!
//! Lets the client keep working without the server: writes that cannot be
//! delivered are queued, reads come from the last snapshot layered with the
//! user's own changes, and a drain reconciles both once connectivity returns.
//!
//! ## Architecture
//!
//! - **Queue**: durable FIFO of pending mutations (`queue.rs`)
//! - **Optimistic records**: local records and the confirmed-change mirror
//!   (`optimistic.rs`)
//! - **Reconciliation**: replay and snapshot refresh (`reconciliation.rs`)
//!
//! [`OfflineManager`] is the explicitly constructed context that owns one of
//! each. Clones share everything.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use journey_sync::config::Config;
//! use journey_sync::offline::OfflineManager;
//!
//! # async fn example() -> journey_sync::shared::Result<()> {
//! let manager = OfflineManager::open(&Config::from_env()?).await?;
//!
//! // Offline or not, this returns a record the UI can show
//! manager.favorites_ops().add("42", Some("Spice Route")).await?;
//!
//! // Later, once back online
//! let report = manager.drain().await?;
//! println!("{} mutations delivered", report.succeeded().count());
//!
//! for favorite in manager.favorites().await? {
//!     println!("{:?}", favorite.get_str("businessId"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod optimistic;
pub mod queue;
pub mod reconciliation;

pub use optimistic::{Collection, OptimisticMirror};
pub use queue::PendingMutationQueue;
pub use reconciliation::{ReconciliationEngine, ReconciliationReport, SkipReason};

use crate::api_client::ApiClient;
use crate::config::Config;
use crate::local_db::{LocalCacheStore, LocalDatabase, UserIdentity};
use crate::operations::{FavoriteOps, ItineraryOps, MutationIssuer, ReservationOps, TransactionOps};
use crate::shared::entity::{CacheSnapshot, Entity};
use crate::shared::error::Result;
use crate::shared::mutation::PendingMutation;
use crate::sync::metrics::SyncMetrics;
use crate::sync::network_monitor::ConnectivityMonitor;
use crate::sync::sync_state::SyncStatus;
use std::sync::Arc;

/// Context owning every offline component
#[derive(Debug, Clone)]
pub struct OfflineManager {
    cache: LocalCacheStore,
    queue: Arc<PendingMutationQueue>,
    identity: UserIdentity,
    mirror: Arc<OptimisticMirror>,
    monitor: Arc<ConnectivityMonitor>,
    engine: Arc<ReconciliationEngine>,
    issuer: MutationIssuer,
}

impl OfflineManager {
    /// Open the database named by `config` and wire everything up
    pub async fn open(config: &Config) -> Result<Self> {
        let db = LocalDatabase::open(config.db_path()).await?;
        Self::with_database(config, db)
    }

    /// Wire everything up over an already opened database
    pub fn with_database(config: &Config, db: LocalDatabase) -> Result<Self> {
        let api = ApiClient::new(config)?;
        let cache = LocalCacheStore::new(db.clone());
        let queue = Arc::new(PendingMutationQueue::new(db.clone()));
        let identity = UserIdentity::new(db);
        let monitor = Arc::new(ConnectivityMonitor::new(api.clone(), config.probe_interval()));
        let mirror = Arc::new(OptimisticMirror::new());

        let engine = Arc::new(ReconciliationEngine::new(
            api.clone(),
            Arc::clone(&queue),
            cache.clone(),
            identity.clone(),
            Arc::clone(&mirror),
            Arc::clone(&monitor),
        ));
        let issuer = MutationIssuer::new(
            api,
            Arc::clone(&queue),
            Arc::clone(&mirror),
            identity.clone(),
        );

        Ok(Self {
            cache,
            queue,
            identity,
            mirror,
            monitor,
            engine,
            issuer,
        })
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Replay the queue and refresh the snapshot now
    pub async fn drain(&self) -> Result<ReconciliationReport> {
        self.engine.drain().await
    }

    pub fn favorites_ops(&self) -> FavoriteOps {
        FavoriteOps::new(self.issuer.clone())
    }

    pub fn transactions_ops(&self) -> TransactionOps {
        TransactionOps::new(self.issuer.clone())
    }

    pub fn itineraries_ops(&self) -> ItineraryOps {
        ItineraryOps::new(self.issuer.clone())
    }

    pub fn reservations_ops(&self) -> ReservationOps {
        ReservationOps::new(self.issuer.clone())
    }

    /// Last persisted snapshot, without optimistic layering
    pub async fn snapshot(&self) -> Option<CacheSnapshot> {
        self.cache.read().await
    }

    pub async fn businesses(&self) -> Result<Vec<Entity>> {
        self.view(Collection::Businesses).await
    }

    pub async fn favorites(&self) -> Result<Vec<Entity>> {
        self.view(Collection::Favorites).await
    }

    pub async fn itineraries(&self) -> Result<Vec<Entity>> {
        self.view(Collection::Itineraries).await
    }

    pub async fn transactions(&self) -> Result<Vec<Entity>> {
        self.view(Collection::Transactions).await
    }

    pub async fn reservations(&self) -> Result<Vec<Entity>> {
        self.view(Collection::Reservations).await
    }

    /// Snapshot section plus mirror plus pending mutations
    pub async fn view(&self, collection: Collection) -> Result<Vec<Entity>> {
        let base = match (collection.snapshot_kind(), self.cache.read().await) {
            (Some(kind), Some(snapshot)) => snapshot.entities(kind).to_vec(),
            _ => Vec::new(),
        };
        let pending = self.queue.list().await?;
        Ok(self.mirror.layer(collection, base, &pending).await)
    }

    pub async fn pending_mutations(&self) -> Result<Vec<PendingMutation>> {
        self.queue.list().await
    }

    pub async fn pending_mutations_count(&self) -> Result<usize> {
        self.queue.len().await
    }

    /// Server id of a local record, once its mutation succeeded
    pub async fn resolve_id(&self, local_id: &str) -> Option<String> {
        self.mirror.resolve_id(local_id).await
    }

    /// Drop the snapshot, the queue and the mirror; keeps the user id
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await?;
        self.mirror.clear().await;
        Ok(())
    }

    pub async fn user_id(&self) -> Result<String> {
        self.identity.user_id().await
    }

    pub async fn status(&self) -> Result<SyncStatus> {
        let state = self.engine.sync_state().await;
        Ok(SyncStatus {
            is_online: self.monitor.is_online(),
            is_syncing: state.is_syncing,
            last_sync_time: state.last_sync_time,
            pending_mutations: self.queue.len().await?,
            snapshot_version: self.cache.version().await,
        })
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.engine.metrics().await
    }
}
