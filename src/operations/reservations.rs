//! Reservations

use super::{require, Issued, MutationIssuer};
use crate::offline::optimistic::is_local_id;
use crate::shared::entity::Entity;
use crate::shared::error::{Result, SyncError};
use crate::shared::mutation::{MutationAction, MutationPayload, ReservationPayload};

/// A reservation request as entered by the user
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub business_id: String,
    /// ISO 8601 date and time
    pub date: String,
    pub party_size: u32,
    pub special_requests: Option<String>,
}

impl NewReservation {
    fn validate(&self) -> Result<()> {
        require("businessId", &self.business_id)?;
        require("date", &self.date)?;
        if self.party_size == 0 {
            return Err(SyncError::invalid_input("partySize", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ReservationOps {
    issuer: MutationIssuer,
}

impl ReservationOps {
    pub fn new(issuer: MutationIssuer) -> Self {
        Self { issuer }
    }

    pub async fn create(&self, reservation: NewReservation) -> Result<Entity> {
        reservation.validate()?;
        let payload = MutationPayload::Reservation(ReservationPayload {
            user_id: self.issuer.user_id().await?,
            reservation_id: None,
            business_id: Some(reservation.business_id),
            date: Some(reservation.date),
            party_size: Some(reservation.party_size),
            special_requests: reservation.special_requests,
        });
        let issued = self.issuer.issue(MutationAction::Create, payload).await?;
        Ok(issued.into_record())
    }

    /// Cancel a reservation by id
    ///
    /// A local id is translated to the server id when the server already
    /// confirmed the reservation.
    pub async fn cancel(&self, reservation_id: &str) -> Result<Issued> {
        require("reservationId", reservation_id)?;
        let mut reservation_id = reservation_id.to_string();
        if is_local_id(&reservation_id) {
            if let Some(server_id) = self.issuer.resolve_id(&reservation_id).await {
                reservation_id = server_id;
            }
        }

        let payload = MutationPayload::Reservation(ReservationPayload {
            user_id: self.issuer.user_id().await?,
            reservation_id: Some(reservation_id),
            business_id: None,
            date: None,
            party_size: None,
            special_requests: None,
        });
        self.issuer.issue(MutationAction::Delete, payload).await
    }
}
