//! Pending mutations
//!
//! A [`PendingMutation`] is a user write the server has not confirmed yet.
//! The payload is a typed union keyed by [`MutationType`]; on the wire and in
//! local storage it keeps the client's historical shape:
//!
//! ```json
//! { "id": "mutation_1700000000000", "type": "favorite", "action": "create",
//!   "data": { "userId": "user_1", "businessId": "42" },
//!   "timestamp": "2024-01-01T10:00:00Z" }
//! ```
//!
//! `data` is exactly the JSON body replayed against the server.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity family a mutation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationType {
    Reservation,
    Favorite,
    Transaction,
    Itinerary,
}

impl MutationType {
    /// Key under which the server returns the written record
    pub fn record_key(self) -> &'static str {
        match self {
            MutationType::Reservation => "reservation",
            MutationType::Favorite => "favorite",
            MutationType::Transaction => "transaction",
            MutationType::Itinerary => "itinerary",
        }
    }
}

/// What the mutation does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritePayload {
    pub user_id: String,
    pub business_id: String,
    /// Display name kept for the optimistic record; the server ignores it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    pub amount: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Kind of itinerary stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Breakfast,
    Lunch,
    Dinner,
    Activity,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryStop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub time: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: StopKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    pub day_number: u32,
    pub title: String,
    #[serde(default)]
    pub stops: Vec<ItineraryStop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryPayload {
    pub user_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Named `stops` on the wire even though it carries days
    #[serde(default)]
    pub stops: Vec<ItineraryDay>,
}

/// Typed mutation body, one variant per [`MutationType`]
#[derive(Debug, Clone, PartialEq)]
pub enum MutationPayload {
    Reservation(ReservationPayload),
    Favorite(FavoritePayload),
    Transaction(TransactionPayload),
    Itinerary(ItineraryPayload),
}

impl MutationPayload {
    pub fn mutation_type(&self) -> MutationType {
        match self {
            MutationPayload::Reservation(_) => MutationType::Reservation,
            MutationPayload::Favorite(_) => MutationType::Favorite,
            MutationPayload::Transaction(_) => MutationType::Transaction,
            MutationPayload::Itinerary(_) => MutationType::Itinerary,
        }
    }

    /// JSON body sent to the server
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            MutationPayload::Reservation(p) => serde_json::to_value(p),
            MutationPayload::Favorite(p) => serde_json::to_value(p),
            MutationPayload::Transaction(p) => serde_json::to_value(p),
            MutationPayload::Itinerary(p) => serde_json::to_value(p),
        }
    }

    /// Parse a JSON body according to its type tag
    pub fn from_json(kind: MutationType, data: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            MutationType::Reservation => MutationPayload::Reservation(serde_json::from_value(data)?),
            MutationType::Favorite => MutationPayload::Favorite(serde_json::from_value(data)?),
            MutationType::Transaction => MutationPayload::Transaction(serde_json::from_value(data)?),
            MutationType::Itinerary => MutationPayload::Itinerary(serde_json::from_value(data)?),
        })
    }
}

/// A queued, not-yet-confirmed write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireMutation", try_from = "WireMutation")]
pub struct PendingMutation {
    pub id: String,
    pub action: MutationAction,
    pub payload: MutationPayload,
    pub enqueued_at: DateTime<Utc>,
}

impl PendingMutation {
    pub fn new(id: impl Into<String>, action: MutationAction, payload: MutationPayload) -> Self {
        Self {
            id: id.into(),
            action,
            payload,
            enqueued_at: Utc::now(),
        }
    }

    pub fn mutation_type(&self) -> MutationType {
        self.payload.mutation_type()
    }

    /// HTTP verb and endpoint the mutation replays against
    pub fn route(&self) -> (Method, &'static str) {
        route_for(self.mutation_type(), self.action)
    }
}

/// Map `type` × `action` onto the server's write endpoints
pub fn route_for(kind: MutationType, action: MutationAction) -> (Method, &'static str) {
    match (kind, action) {
        (MutationType::Reservation, MutationAction::Delete) => (Method::DELETE, "/api/reservations"),
        (MutationType::Reservation, _) => (Method::POST, "/api/reservations"),
        (MutationType::Favorite, MutationAction::Delete) => (Method::DELETE, "/api/favorites"),
        (MutationType::Favorite, _) => (Method::POST, "/api/favorites"),
        (MutationType::Transaction, _) => (Method::POST, "/api/budget/transaction"),
        (MutationType::Itinerary, _) => (Method::POST, "/api/itineraries"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMutation {
    id: String,
    #[serde(rename = "type")]
    kind: MutationType,
    action: MutationAction,
    data: Value,
    timestamp: DateTime<Utc>,
}

impl From<PendingMutation> for WireMutation {
    fn from(m: PendingMutation) -> Self {
        let kind = m.mutation_type();
        // payload structs hold only strings, numbers and vecs
        let data = m.payload.to_json().unwrap_or(Value::Null);
        Self {
            id: m.id,
            kind,
            action: m.action,
            data,
            timestamp: m.enqueued_at,
        }
    }
}

impl TryFrom<WireMutation> for PendingMutation {
    type Error = serde_json::Error;

    fn try_from(w: WireMutation) -> Result<Self, Self::Error> {
        Ok(Self {
            payload: MutationPayload::from_json(w.kind, w.data)?,
            id: w.id,
            action: w.action,
            enqueued_at: w.timestamp,
        })
    }
}
