//! # State Reconciliation
//!
//! Drains the pending mutation queue against the server and refreshes the
//! cached snapshot.
//!
//! ## Drain
//!
//! 1. Offline: nothing happens, the report says `Offline`
//! 2. Another drain in flight: coalesced, the report says `AlreadyRunning`
//! 3. Queue replayed front to back, one request per mutation, no retries
//! 4. Successful mutations remap their local id and leave the queue;
//!    failed ones stay, in order
//! 5. Snapshot refetched; on any fetch failure the old snapshot is kept
//!
//! Delivery is at-least-once: a mutation whose response was lost is sent
//! again on the next drain. Only local storage failures make `drain` return
//! an error.

use crate::api_client::ApiClient;
use crate::local_db::{LocalCacheStore, UserIdentity};
use crate::offline::optimistic::{local_id_for, OptimisticMirror};
use crate::offline::queue::PendingMutationQueue;
use crate::shared::error::{Result, SyncError};
use crate::shared::mutation::{MutationAction, MutationType, PendingMutation};
use crate::sync::metrics::{SnapshotRefresh, SyncMetrics};
use crate::sync::network_monitor::ConnectivityMonitor;
use crate::sync::sync_state::SyncState;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Result of replaying one mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub mutation_id: String,
    #[serde(rename = "type")]
    pub mutation_type: MutationType,
    pub action: MutationAction,
    pub succeeded: bool,
    /// HTTP status of a failed attempt, `None` for transport failures
    pub status: Option<u16>,
}

/// Why a drain did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    Offline,
    AlreadyRunning,
}

/// What one drain did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub outcomes: Vec<MutationOutcome>,
    pub snapshot_refreshed: bool,
    /// The fetched snapshot was older than the cached one and was refused
    pub snapshot_stale: bool,
    pub skipped: Option<SkipReason>,
}

impl ReconciliationReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &MutationOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded)
    }

    pub fn failed(&self) -> impl Iterator<Item = &MutationOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }
}

/// Clears the in-flight flag on every exit path
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Replays queued mutations and refreshes the snapshot
#[derive(Debug)]
pub struct ReconciliationEngine {
    api: ApiClient,
    queue: Arc<PendingMutationQueue>,
    cache: LocalCacheStore,
    identity: UserIdentity,
    mirror: Arc<OptimisticMirror>,
    monitor: Arc<ConnectivityMonitor>,
    metrics: RwLock<SyncMetrics>,
    state: RwLock<SyncState>,
    in_flight: AtomicBool,
}

impl ReconciliationEngine {
    pub fn new(
        api: ApiClient,
        queue: Arc<PendingMutationQueue>,
        cache: LocalCacheStore,
        identity: UserIdentity,
        mirror: Arc<OptimisticMirror>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            api,
            queue,
            cache,
            identity,
            mirror,
            monitor,
            metrics: RwLock::new(SyncMetrics::new()),
            state: RwLock::new(SyncState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run one drain
    pub async fn drain(&self) -> Result<ReconciliationReport> {
        if !self.monitor.is_online() {
            tracing::debug!("Offline, drain skipped");
            self.metrics.write().await.record_offline_skip();
            return Ok(ReconciliationReport::skipped(SkipReason::Offline));
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Drain already in flight, coalesced");
            self.metrics.write().await.record_coalesced();
            return Ok(ReconciliationReport::skipped(SkipReason::AlreadyRunning));
        };

        let started = Instant::now();
        self.state.write().await.is_syncing = true;

        let result = self.replay_and_refresh().await;

        {
            let mut state = self.state.write().await;
            state.is_syncing = false;
            match &result {
                Ok(report) => {
                    state.last_error = None;
                    if report.snapshot_refreshed {
                        state.last_sync_time = Some(Utc::now());
                    }
                }
                Err(e) => state.last_error = Some(e.to_string()),
            }
        }

        match &result {
            Ok(report) => {
                let replayed = report.succeeded().count();
                let failed = report.failed().count();
                let snapshot = if report.snapshot_refreshed {
                    SnapshotRefresh::Applied
                } else if report.snapshot_stale {
                    SnapshotRefresh::Stale
                } else {
                    SnapshotRefresh::FetchFailed
                };
                self.metrics.write().await.record_drain(
                    replayed as u64,
                    failed as u64,
                    snapshot,
                    started.elapsed(),
                );
                tracing::info!(
                    replayed,
                    failed,
                    snapshot_refreshed = report.snapshot_refreshed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Drain finished"
                );
            }
            Err(e) => tracing::error!("Drain aborted by storage failure: {}", e),
        }

        result
    }

    async fn replay_and_refresh(&self) -> Result<ReconciliationReport> {
        let pending = self.queue.list().await?;
        let mut outcomes = Vec::with_capacity(pending.len());
        let mut confirmed = Vec::new();

        for mutation in &pending {
            let outcome = self.replay(mutation).await;
            if outcome.succeeded {
                confirmed.push(mutation.id.clone());
            }
            outcomes.push(outcome);
        }

        self.queue.remove_confirmed(&confirmed).await?;
        let snapshot = self.refresh_snapshot().await?;

        Ok(ReconciliationReport {
            outcomes,
            snapshot_refreshed: snapshot == SnapshotRefresh::Applied,
            snapshot_stale: snapshot == SnapshotRefresh::Stale,
            skipped: None,
        })
    }

    async fn replay(&self, mutation: &PendingMutation) -> MutationOutcome {
        let mut outcome = MutationOutcome {
            mutation_id: mutation.id.clone(),
            mutation_type: mutation.mutation_type(),
            action: mutation.action,
            succeeded: false,
            status: None,
        };

        match self.api.send_mutation(mutation).await {
            Ok(response) => {
                let record = self
                    .mirror
                    .record_confirmation(mutation.action, &mutation.payload, &response)
                    .await;
                if let Some(server_id) = record.and_then(|r| r.id()) {
                    self.mirror.remap(local_id_for(&mutation.id), server_id).await;
                }
                tracing::debug!(mutation_id = %mutation.id, "Mutation replayed");
                outcome.succeeded = true;
            }
            Err(e) => {
                outcome.status = match &e {
                    SyncError::Status { status, .. } => Some(status.as_u16()),
                    _ => None,
                };
                if e.is_connectivity() {
                    tracing::debug!(mutation_id = %mutation.id, "Mutation replay failed: {}", e);
                } else {
                    tracing::warn!(mutation_id = %mutation.id, "Server rejected queued mutation: {}", e);
                }
            }
        }

        outcome
    }

    /// Fetch and persist a fresh snapshot, keeping the old one on any failure
    async fn refresh_snapshot(&self) -> Result<SnapshotRefresh> {
        let user_id = self.identity.user_id().await?;

        let snapshot = match self.api.fetch_snapshot(&user_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Snapshot fetch failed, keeping cached snapshot: {}", e);
                return Ok(SnapshotRefresh::FetchFailed);
            }
        };

        match self.cache.write(&snapshot).await {
            Ok(()) => {
                self.mirror.prune(&snapshot).await;
                Ok(SnapshotRefresh::Applied)
            }
            Err(SyncError::StaleSnapshot { .. }) => Ok(SnapshotRefresh::Stale),
            Err(e) => Err(e),
        }
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn sync_state(&self) -> SyncState {
        self.state.read().await.clone()
    }

    pub fn is_draining(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}
