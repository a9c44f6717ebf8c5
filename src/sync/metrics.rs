//! # Sync Metrics
//!
//! Counters for drains and replayed mutations, kept in memory.

use serde::Serialize;
use std::time::Duration;

/// What happened to the snapshot at the end of a drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapshotRefresh {
    Applied,
    /// A fetch failed; the cached snapshot was kept
    FetchFailed,
    /// The server sent an older version than the cached one
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncMetrics {
    /// Drains that ran a replay pass
    pub total_drains: u64,
    /// Drains skipped because one was already running
    pub coalesced_drains: u64,
    /// Drains skipped because the device was offline
    pub offline_skips: u64,
    pub mutations_replayed: u64,
    pub mutations_failed: u64,
    pub snapshot_refreshes: u64,
    pub snapshot_failures: u64,
    /// Snapshots refused for carrying an older version
    pub stale_snapshots: u64,
    pub average_drain_duration: Duration,
    pub last_drain_duration: Option<Duration>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_offline_skip(&mut self) {
        self.offline_skips += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced_drains += 1;
    }

    /// Record a completed replay pass
    pub fn record_drain(
        &mut self,
        replayed: u64,
        failed: u64,
        snapshot: SnapshotRefresh,
        duration: Duration,
    ) {
        self.total_drains += 1;
        self.mutations_replayed += replayed;
        self.mutations_failed += failed;
        match snapshot {
            SnapshotRefresh::Applied => self.snapshot_refreshes += 1,
            SnapshotRefresh::FetchFailed => self.snapshot_failures += 1,
            SnapshotRefresh::Stale => self.stale_snapshots += 1,
        }
        self.last_drain_duration = Some(duration);

        // rolling average, in nanoseconds so large drain counts cannot overflow
        let total = self.average_drain_duration.as_nanos() * u128::from(self.total_drains - 1)
            + duration.as_nanos();
        let average = total / u128::from(self.total_drains);
        self.average_drain_duration = Duration::from_nanos(u64::try_from(average).unwrap_or(u64::MAX));
    }

    /// Share of replayed mutations the server accepted
    pub fn success_rate(&self) -> f64 {
        let attempted = self.mutations_replayed + self.mutations_failed;
        if attempted == 0 {
            0.0
        } else {
            self.mutations_replayed as f64 / attempted as f64
        }
    }
}
