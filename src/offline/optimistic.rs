//! # Optimistic Records
//!
//! Everything the user did that the last snapshot does not show yet.
//!
//! Two sources feed the layered view:
//!
//! - **Local records**, derived on the fly from pending `create` mutations.
//!   The record for `mutation_<n>` always has id `local_<n>`, so the pair
//!   survives a restart with nothing but the persisted queue.
//! - **[`OptimisticMirror`]**, in memory: records the server already
//!   confirmed but no snapshot has carried yet, tombstones for confirmed
//!   deletes, and the `local_<n>` → server id map.
//!
//! [`OptimisticMirror::prune`] drops mirror entries once a newer snapshot
//! represents them.

use crate::shared::entity::{CacheSnapshot, Entity, EntityKind};
use crate::shared::mutation::{MutationAction, MutationPayload, MutationType, PendingMutation};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

pub const LOCAL_ID_PREFIX: &str = "local_";
pub const MUTATION_ID_PREFIX: &str = "mutation_";

/// Whether `id` names a record that only exists on this device
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX) || id.starts_with(MUTATION_ID_PREFIX)
}

/// Id of the local record paired with a mutation id
pub fn local_id_for(mutation_id: &str) -> String {
    let suffix = mutation_id
        .strip_prefix(MUTATION_ID_PREFIX)
        .unwrap_or(mutation_id);
    format!("{LOCAL_ID_PREFIX}{suffix}")
}

/// A list the UI reads through the layered view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Businesses,
    Favorites,
    Itineraries,
    Transactions,
    Reservations,
}

impl Collection {
    /// Snapshot section backing this collection, if any
    pub fn snapshot_kind(self) -> Option<EntityKind> {
        match self {
            Collection::Businesses => Some(EntityKind::BusinessCatalog),
            Collection::Favorites => Some(EntityKind::Favorites),
            Collection::Itineraries => Some(EntityKind::Itineraries),
            Collection::Transactions | Collection::Reservations => None,
        }
    }

    pub fn for_mutation(kind: MutationType) -> Self {
        match kind {
            MutationType::Favorite => Collection::Favorites,
            MutationType::Itinerary => Collection::Itineraries,
            MutationType::Transaction => Collection::Transactions,
            MutationType::Reservation => Collection::Reservations,
        }
    }

    /// Whether `entity` is the one a delete of `target` removes
    ///
    /// Favorites are deleted by business id, everything else by id.
    fn matches(self, entity: &Entity, target: &str) -> bool {
        let field = match self {
            Collection::Favorites => "businessId",
            _ => "id",
        };
        field_as_string(entity, field).as_deref() == Some(target)
    }
}

fn field_as_string(entity: &Entity, field: &str) -> Option<String> {
    match entity.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Record shown for a pending `create` until the server confirms it
pub fn local_record(mutation: &PendingMutation) -> Option<Entity> {
    if mutation.action != MutationAction::Create {
        return None;
    }
    let mut record = Entity::from_value(mutation.payload.to_json().ok()?)?;
    record.insert("id", local_id_for(&mutation.id));
    record.insert("createdAt", mutation.enqueued_at.to_rfc3339());
    if let MutationPayload::Itinerary(_) = mutation.payload {
        record.insert("isPublic", false);
    }
    Some(record)
}

/// What a pending `delete` removes from its collection
pub fn delete_target(mutation: &PendingMutation) -> Option<String> {
    if mutation.action != MutationAction::Delete {
        return None;
    }
    delete_key(&mutation.payload)
}

fn delete_key(payload: &MutationPayload) -> Option<String> {
    match payload {
        MutationPayload::Favorite(p) => Some(p.business_id.clone()),
        MutationPayload::Reservation(p) => p.reservation_id.clone(),
        MutationPayload::Transaction(_) | MutationPayload::Itinerary(_) => None,
    }
}

#[derive(Debug, Default)]
struct MirrorState {
    confirmed: HashMap<Collection, Vec<Entity>>,
    tombstones: HashMap<Collection, HashSet<String>>,
    remapped: HashMap<String, String>,
}

/// Server-confirmed changes not yet carried by a snapshot
#[derive(Debug, Default)]
pub struct OptimisticMirror {
    state: RwLock<MirrorState>,
}

impl OptimisticMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a record the server accepted
    ///
    /// Replaces a mirrored record with the same id and lifts any tombstone
    /// the record matches.
    pub async fn confirm(&self, collection: Collection, record: Entity) {
        let mut state = self.state.write().await;
        if let Some(tombstones) = state.tombstones.get_mut(&collection) {
            tombstones.retain(|target| !collection.matches(&record, target));
        }
        let records = state.confirmed.entry(collection).or_default();
        if let Some(id) = record.id() {
            records.retain(|r| r.id().as_deref() != Some(id.as_str()));
        }
        records.push(record);
    }

    /// Fold a successful write response into the mirror
    ///
    /// Creates and updates mirror the record found under the type's response
    /// key (`favorite`, `itinerary`, ...); deletes leave a tombstone. Returns
    /// the server record when there is one.
    pub async fn record_confirmation(
        &self,
        action: MutationAction,
        payload: &MutationPayload,
        response: &Value,
    ) -> Option<Entity> {
        let kind = payload.mutation_type();
        let collection = Collection::for_mutation(kind);
        match action {
            MutationAction::Create | MutationAction::Update => {
                let record = response
                    .get(kind.record_key())
                    .cloned()
                    .and_then(Entity::from_value)?;
                self.confirm(collection, record.clone()).await;
                Some(record)
            }
            MutationAction::Delete => {
                if let Some(target) = delete_key(payload) {
                    self.confirm_delete(collection, target).await;
                }
                None
            }
        }
    }

    /// Remember a delete the server accepted
    pub async fn confirm_delete(&self, collection: Collection, target: impl Into<String>) {
        let target = target.into();
        let mut state = self.state.write().await;
        if let Some(records) = state.confirmed.get_mut(&collection) {
            records.retain(|r| !collection.matches(r, &target));
        }
        state.tombstones.entry(collection).or_default().insert(target);
    }

    /// Map a local id to the id the server issued
    pub async fn remap(&self, local_id: impl Into<String>, server_id: impl Into<String>) {
        let (local_id, server_id) = (local_id.into(), server_id.into());
        tracing::debug!(%local_id, %server_id, "Local id remapped");
        self.state.write().await.remapped.insert(local_id, server_id);
    }

    /// Server id for a local id, if the server has confirmed it
    pub async fn resolve_id(&self, local_id: &str) -> Option<String> {
        self.state.read().await.remapped.get(local_id).cloned()
    }

    /// Drop what `snapshot` now represents
    ///
    /// Confirmed records whose id appears in the snapshot go away, and so do
    /// tombstones whose target the snapshot no longer contains. Collections
    /// without a snapshot section are left alone.
    pub async fn prune(&self, snapshot: &CacheSnapshot) {
        let mut state = self.state.write().await;

        for (collection, records) in state.confirmed.iter_mut() {
            if let Some(kind) = collection.snapshot_kind() {
                records.retain(|r| match r.id() {
                    Some(id) => !snapshot.contains_id(kind, &id),
                    None => true,
                });
            }
        }

        for (collection, tombstones) in state.tombstones.iter_mut() {
            if let Some(kind) = collection.snapshot_kind() {
                let entities = snapshot.entities(kind);
                tombstones.retain(|target| entities.iter().any(|e| collection.matches(e, target)));
            }
        }
    }

    /// Forget everything
    pub async fn clear(&self) {
        *self.state.write().await = MirrorState::default();
    }

    /// Number of confirmed records still waiting for a snapshot
    pub async fn confirmed_len(&self) -> usize {
        self.state.read().await.confirmed.values().map(Vec::len).sum()
    }

    /// Build the layered view of one collection
    ///
    /// `base` is the snapshot section. Confirmed records are added when the
    /// snapshot lacks their id, tombstoned entities are removed, then pending
    /// mutations are applied in queue order: creates add their local record
    /// unless their local id is already remapped, deletes remove their target.
    pub async fn layer(
        &self,
        collection: Collection,
        base: Vec<Entity>,
        pending: &[PendingMutation],
    ) -> Vec<Entity> {
        let state = self.state.read().await;
        let mut view = base;

        if let Some(records) = state.confirmed.get(&collection) {
            for record in records {
                let present = record
                    .id()
                    .map(|id| view.iter().any(|e| e.id().as_deref() == Some(id.as_str())))
                    .unwrap_or(false);
                if !present {
                    view.push(record.clone());
                }
            }
        }

        if let Some(tombstones) = state.tombstones.get(&collection) {
            view.retain(|e| !tombstones.iter().any(|t| collection.matches(e, t)));
        }

        for mutation in pending
            .iter()
            .filter(|m| Collection::for_mutation(m.mutation_type()) == collection)
        {
            match mutation.action {
                // already confirmed in this drain; the mirrored server record stands in
                MutationAction::Create if state.remapped.contains_key(&local_id_for(&mutation.id)) => {}
                MutationAction::Create => view.extend(local_record(mutation)),
                MutationAction::Delete => {
                    if let Some(target) = delete_target(mutation) {
                        view.retain(|e| !collection.matches(e, &target));
                    }
                }
                MutationAction::Update => {}
            }
        }

        view
    }
}
