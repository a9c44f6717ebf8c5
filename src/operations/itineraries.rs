//! Itineraries: saving and sharing
//!
//! Sharing needs a server id. A draft that only exists locally is not
//! published; the caller gets [`ShareOutcome::Deferred`] and can try again
//! once the queued save has gone through.

use super::{require, MutationIssuer};
use crate::offline::optimistic::is_local_id;
use crate::shared::entity::Entity;
use crate::shared::error::{Result, SyncError};
use crate::shared::mutation::{ItineraryDay, ItineraryPayload, MutationAction, MutationPayload};

/// An itinerary as edited in the UI
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItineraryDraft {
    /// Server or local id, `None` until first saved
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    /// Number of days
    pub duration: u32,
    pub city: Option<String>,
    pub days: Vec<ItineraryDay>,
    /// Set once the itinerary has been published
    pub share_code: Option<String>,
}

impl ItineraryDraft {
    fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        if self.duration == 0 {
            return Err(SyncError::invalid_input("duration", "must be at least one day"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Published { share_code: String },
    /// Not shareable yet: only known locally, or the server is unreachable
    Deferred,
}

#[derive(Debug, Clone)]
pub struct ItineraryOps {
    issuer: MutationIssuer,
}

impl ItineraryOps {
    pub fn new(issuer: MutationIssuer) -> Self {
        Self { issuer }
    }

    /// Save a draft
    pub async fn save(&self, draft: ItineraryDraft) -> Result<Entity> {
        draft.validate()?;
        let payload = MutationPayload::Itinerary(ItineraryPayload {
            user_id: self.issuer.user_id().await?,
            title: draft.title,
            description: draft.description,
            duration: draft.duration,
            city: draft.city,
            stops: draft.days,
        });
        let issued = self.issuer.issue(MutationAction::Create, payload).await?;
        Ok(issued.into_record())
    }

    /// Publish an itinerary and return its share code
    ///
    /// A draft without an id is saved first. An existing share code is
    /// returned without contacting the server.
    pub async fn share(&self, draft: ItineraryDraft) -> Result<ShareOutcome> {
        if let Some(share_code) = draft.share_code.clone() {
            return Ok(ShareOutcome::Published { share_code });
        }

        let id = match draft.id.clone() {
            Some(id) => Some(id),
            None => self.save(draft).await?.id(),
        };
        let Some(mut id) = id else {
            return Ok(ShareOutcome::Deferred);
        };

        if is_local_id(&id) {
            match self.issuer.resolve_id(&id).await {
                Some(server_id) => id = server_id,
                None => {
                    tracing::debug!(itinerary_id = %id, "Itinerary not on the server yet, share deferred");
                    return Ok(ShareOutcome::Deferred);
                }
            }
        }

        match self.issuer.api().publish_itinerary(&id).await {
            Ok(share_code) => Ok(ShareOutcome::Published { share_code }),
            Err(e) if e.is_connectivity() => {
                tracing::info!(itinerary_id = %id, "Publish failed, share deferred: {}", e);
                Ok(ShareOutcome::Deferred)
            }
            Err(e) => Err(e.into_rejection()),
        }
    }
}
