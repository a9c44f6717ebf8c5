//! # Mutation-Issuing Operations
//!
//! Every user write goes through [`MutationIssuer::issue`]:
//!
//! - the request is attempted right away, under the request timeout;
//! - on success the server record is mirrored and returned;
//! - on a connectivity-class failure the mutation is queued and a local
//!   record (`local_<n>`) is returned instead;
//! - any other failure is a rejection and nothing is queued.
//!
//! Input is validated before any I/O.

pub mod favorites;
pub mod itineraries;
pub mod reservations;
pub mod transactions;

pub use favorites::FavoriteOps;
pub use itineraries::{ItineraryDraft, ItineraryOps, ShareOutcome};
pub use reservations::{NewReservation, ReservationOps};
pub use transactions::{NewTransaction, TransactionKind, TransactionOps};

use crate::api_client::ApiClient;
use crate::local_db::UserIdentity;
use crate::offline::optimistic::{local_record, OptimisticMirror};
use crate::offline::queue::PendingMutationQueue;
use crate::shared::entity::Entity;
use crate::shared::error::{Result, SyncError};
use crate::shared::mutation::{route_for, MutationAction, MutationPayload, PendingMutation};
use std::sync::Arc;

/// How a write was handled
#[derive(Debug, Clone, PartialEq)]
pub enum Issued {
    /// The server accepted it
    Confirmed { record: Entity },
    /// The server was unreachable; the write waits in the queue
    Queued { mutation_id: String, record: Entity },
}

impl Issued {
    /// Record to show: the server's, or the local one
    pub fn record(&self) -> &Entity {
        match self {
            Issued::Confirmed { record } | Issued::Queued { record, .. } => record,
        }
    }

    pub fn into_record(self) -> Entity {
        match self {
            Issued::Confirmed { record } | Issued::Queued { record, .. } => record,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Issued::Queued { .. })
    }
}

/// Shared write path of every operation
#[derive(Debug, Clone)]
pub struct MutationIssuer {
    api: ApiClient,
    queue: Arc<PendingMutationQueue>,
    mirror: Arc<OptimisticMirror>,
    identity: UserIdentity,
}

impl MutationIssuer {
    pub fn new(
        api: ApiClient,
        queue: Arc<PendingMutationQueue>,
        mirror: Arc<OptimisticMirror>,
        identity: UserIdentity,
    ) -> Self {
        Self {
            api,
            queue,
            mirror,
            identity,
        }
    }

    pub async fn user_id(&self) -> Result<String> {
        self.identity.user_id().await
    }

    pub(crate) fn api(&self) -> &ApiClient {
        &self.api
    }

    pub(crate) async fn resolve_id(&self, local_id: &str) -> Option<String> {
        self.mirror.resolve_id(local_id).await
    }

    /// Attempt a write, queueing it when the server is unreachable
    pub async fn issue(&self, action: MutationAction, payload: MutationPayload) -> Result<Issued> {
        let body = payload.to_json()?;
        let (method, path) = route_for(payload.mutation_type(), action);

        match self.api.send_json(method, path, &body).await {
            Ok(response) => {
                let record = self
                    .mirror
                    .record_confirmation(action, &payload, &response)
                    .await
                    .or_else(|| Entity::from_value(body))
                    .unwrap_or_default();
                Ok(Issued::Confirmed { record })
            }
            Err(e) if e.is_connectivity() => {
                tracing::info!(path, "Server unreachable, queueing mutation: {}", e);
                let mutation = self
                    .queue
                    .enqueue(PendingMutation::new(self.queue.next_mutation_id(), action, payload))
                    .await?;

                let record = local_record(&mutation)
                    .or_else(|| mutation.payload.to_json().ok().and_then(Entity::from_value))
                    .unwrap_or_default();
                Ok(Issued::Queued {
                    mutation_id: mutation.id,
                    record,
                })
            }
            Err(e) => {
                let e = e.into_rejection();
                tracing::warn!(path, "Write rejected: {}", e);
                Err(e)
            }
        }
    }
}

/// Reject empty or whitespace-only strings
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SyncError::invalid_input(field, "must not be empty"));
    }
    Ok(())
}
