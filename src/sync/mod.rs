//! # Background Sync Service
//!
//! Keeps the offline engine moving without the UI having to ask.
//!
//! ## Architecture
//!
//! - **Network Monitor**: periodic health probe (`network_monitor.rs`)
//! - **Sync State**: progress flags and the UI-facing status (`sync_state.rs`)
//! - **Metrics**: drain counters and timings (`metrics.rs`)
//!
//! [`SyncService::start`] spawns two tasks: the monitor's probe loop and a
//! watcher that starts a drain whenever connectivity flips from offline to
//! online. Going offline only updates the flag. [`SyncService::force_sync`]
//! is the manual "sync now".
//!
//! ## Usage
//!
//! ```rust,no_run
//! use journey_sync::offline::OfflineManager;
//! use journey_sync::sync::SyncService;
//!
//! # async fn example(manager: OfflineManager) -> journey_sync::shared::Result<()> {
//! let mut sync_service = SyncService::new(manager);
//! sync_service.start();
//!
//! let status = sync_service.status().await?;
//! println!("{} mutations pending", status.pending_mutations);
//!
//! sync_service.force_sync().await?;
//! sync_service.stop();
//! # Ok(())
//! # }
//! ```

pub mod metrics;
pub mod network_monitor;
pub mod sync_state;

pub use metrics::{SnapshotRefresh, SyncMetrics};
pub use network_monitor::{ConnectivityMonitor, ConnectivityState, Transition};
pub use sync_state::{SyncState, SyncStatus};

use crate::offline::{OfflineManager, ReconciliationReport};
use crate::shared::error::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Main sync service coordinator
#[derive(Debug)]
pub struct SyncService {
    manager: OfflineManager,
    monitor_task: Option<JoinHandle<()>>,
    watcher_task: Option<JoinHandle<()>>,
}

impl SyncService {
    pub fn new(manager: OfflineManager) -> Self {
        Self {
            manager,
            monitor_task: None,
            watcher_task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.monitor_task.is_some()
    }

    /// Start probing and draining in the background; no-op when running
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::warn!("Sync service is already running");
            return;
        }

        // subscribe before the first probe so its transition is not missed
        let mut rx = self.manager.monitor().subscribe();
        let was_online = rx.borrow_and_update().is_online;
        let manager = self.manager.clone();
        self.watcher_task = Some(tokio::spawn(Self::watch_transitions(manager, rx, was_online)));

        let monitor = Arc::clone(self.manager.monitor());
        self.monitor_task = Some(tokio::spawn(async move { monitor.run().await }));

        tracing::info!("Sync service started");
    }

    /// Stop the background tasks; a drain already running finishes on its own
    pub fn stop(&mut self) {
        let mut stopped = false;
        for handle in [self.monitor_task.take(), self.watcher_task.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
            stopped = true;
        }
        if stopped {
            tracing::info!("Sync service stopped");
        }
    }

    /// Drain now; still skipped while the monitor reports offline
    pub async fn force_sync(&self) -> Result<ReconciliationReport> {
        self.manager.drain().await
    }

    pub async fn status(&self) -> Result<SyncStatus> {
        self.manager.status().await
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.manager.metrics().await
    }

    /// Spawn a drain on every offline-to-online edge
    async fn watch_transitions(
        manager: OfflineManager,
        mut rx: watch::Receiver<ConnectivityState>,
        mut was_online: bool,
    ) {
        while rx.changed().await.is_ok() {
            let is_online = rx.borrow_and_update().is_online;
            if is_online && !was_online {
                let engine = Arc::clone(manager.engine());
                tokio::spawn(async move {
                    if let Err(e) = engine.drain().await {
                        tracing::error!("Background drain failed: {}", e);
                    }
                });
            }
            was_online = is_online;
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        self.stop();
    }
}
