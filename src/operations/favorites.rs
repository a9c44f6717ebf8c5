//! Favorite businesses

use super::{require, Issued, MutationIssuer};
use crate::shared::entity::Entity;
use crate::shared::error::Result;
use crate::shared::mutation::{FavoritePayload, MutationAction, MutationPayload};

#[derive(Debug, Clone)]
pub struct FavoriteOps {
    issuer: MutationIssuer,
}

impl FavoriteOps {
    pub fn new(issuer: MutationIssuer) -> Self {
        Self { issuer }
    }

    /// Add a business to the user's favorites
    ///
    /// `business_name` only decorates the local record shown while offline.
    pub async fn add(&self, business_id: &str, business_name: Option<&str>) -> Result<Entity> {
        require("businessId", business_id)?;
        let payload = MutationPayload::Favorite(FavoritePayload {
            user_id: self.issuer.user_id().await?,
            business_id: business_id.to_string(),
            business_name: business_name.map(str::to_string),
        });
        let issued = self.issuer.issue(MutationAction::Create, payload).await?;
        Ok(issued.into_record())
    }

    /// Remove a business from the user's favorites
    pub async fn remove(&self, business_id: &str) -> Result<Issued> {
        require("businessId", business_id)?;
        let payload = MutationPayload::Favorite(FavoritePayload {
            user_id: self.issuer.user_id().await?,
            business_id: business_id.to_string(),
            business_name: None,
        });
        self.issuer.issue(MutationAction::Delete, payload).await
    }
}
