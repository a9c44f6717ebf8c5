//! # Pending Mutation Queue
//!
//! Durable FIFO of writes the server has not confirmed, stored as one JSON
//! array under the `pendingMutations` key. There is no in-memory copy: every
//! change is a read-modify-write inside a [`KvWriter`](crate::local_db::KvWriter),
//! so a crash between two calls never loses or duplicates an entry.
//!
//! ## Guarantees
//!
//! - **Order**: `list()` returns insertion order; nothing is ever reordered
//! - **Durability**: `enqueue` returns only after the write committed
//! - **No deduplication**: two identical mutations are two entries
//! - **Unique ids**: a queued id is never handed out again, even across
//!   restarts with a clock that went backwards
//! - **Corruption**: an unreadable array reads as empty and is overwritten by
//!   the next write
//!
//! ## Usage
//!
//! ```rust,no_run
//! use journey_sync::local_db::LocalDatabase;
//! use journey_sync::offline::queue::PendingMutationQueue;
//!
//! # async fn example() -> journey_sync::shared::Result<()> {
//! let queue = PendingMutationQueue::new(LocalDatabase::in_memory().await?);
//!
//! for mutation in queue.list().await? {
//!     // replay...
//!     queue.remove_confirmed(&[mutation.id]).await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::local_db::schema::PENDING_MUTATIONS_KEY;
use crate::local_db::LocalDatabase;
use crate::offline::optimistic::MUTATION_ID_PREFIX;
use crate::shared::error::Result;
use crate::shared::mutation::PendingMutation;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Persistent queue of pending mutations
#[derive(Debug)]
pub struct PendingMutationQueue {
    db: LocalDatabase,
    /// Last numeric suffix handed out by [`PendingMutationQueue::next_mutation_id`]
    last_id: AtomicU64,
}

impl PendingMutationQueue {
    pub fn new(db: LocalDatabase) -> Self {
        Self {
            db,
            last_id: AtomicU64::new(0),
        }
    }

    /// Fresh `mutation_<n>` id
    ///
    /// `n` is the current time in milliseconds, bumped when needed so that
    /// ids handed out by this queue are strictly increasing. Ids already in
    /// the persisted queue raise the floor once [`enqueue`](Self::enqueue)
    /// has seen them.
    pub fn next_mutation_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        format!("{}{}", MUTATION_ID_PREFIX, now.max(previous + 1))
    }

    /// Append a mutation; never rejects, no size limit
    ///
    /// Returns the mutation as stored. Its id is replaced by a fresh one when
    /// it is not above every id already queued, which happens after the
    /// clock stepped back across a restart or when two queues share one
    /// database file.
    pub async fn enqueue(&self, mut mutation: PendingMutation) -> Result<PendingMutation> {
        let mut writer = self.db.writer().await?;
        let mut pending = decode(writer.get(PENDING_MUTATIONS_KEY).await?);

        let highest = pending.iter().filter_map(|m| id_suffix(&m.id)).max();
        if let Some(highest) = highest {
            self.last_id.fetch_max(highest, Ordering::SeqCst);
        }
        let taken = pending.iter().any(|m| m.id == mutation.id);
        let behind = matches!((id_suffix(&mutation.id), highest), (Some(n), Some(h)) if n <= h);
        if taken || behind {
            let fresh = self.next_mutation_id();
            tracing::debug!(stale_id = %mutation.id, id = %fresh, "Mutation id reassigned");
            mutation.id = fresh;
        }

        pending.push(mutation.clone());
        writer
            .put(PENDING_MUTATIONS_KEY, &serde_json::to_string(&pending)?)
            .await?;
        writer.commit().await?;

        tracing::debug!(
            mutation_id = %mutation.id,
            mutation_type = ?mutation.mutation_type(),
            action = ?mutation.action,
            queued = pending.len(),
            "Mutation queued"
        );
        Ok(mutation)
    }

    /// All pending mutations in insertion order
    pub async fn list(&self) -> Result<Vec<PendingMutation>> {
        Ok(decode(self.db.get(PENDING_MUTATIONS_KEY).await?))
    }

    /// Number of pending mutations
    pub async fn len(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Remove exactly the given ids, keeping the others in order
    ///
    /// Returns how many entries were removed. Unknown ids are ignored.
    pub async fn remove_confirmed(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let confirmed: HashSet<&str> = ids.iter().map(String::as_str).collect();

        let mut writer = self.db.writer().await?;
        let mut pending = decode(writer.get(PENDING_MUTATIONS_KEY).await?);
        let before = pending.len();
        pending.retain(|m| !confirmed.contains(m.id.as_str()));
        let removed = before - pending.len();

        writer
            .put(PENDING_MUTATIONS_KEY, &serde_json::to_string(&pending)?)
            .await?;
        writer.commit().await?;

        tracing::debug!(removed, remaining = pending.len(), "Confirmed mutations removed");
        Ok(removed)
    }
}

/// Numeric part of a `mutation_<n>` id
fn id_suffix(id: &str) -> Option<u64> {
    id.strip_prefix(MUTATION_ID_PREFIX)?.parse().ok()
}

fn decode(raw: Option<String>) -> Vec<PendingMutation> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(pending) => pending,
        Err(e) => {
            tracing::warn!("Ignoring corrupt pending mutation queue: {}", e);
            Vec::new()
        }
    }
}
