//! # REST API Client
//!
//! Thin typed layer over the food-discovery API. Every method either returns
//! the decoded body of a 2xx response or a [`SyncError`]; callers decide what
//! a failure means through [`SyncError::is_connectivity`].
//!
//! Requests carry a bounded timeout (`request_timeout`), the health probe its
//! own shorter one (`probe_timeout`).

use crate::config::Config;
use crate::shared::entity::{CacheSnapshot, Entity, EntityKind};
use crate::shared::error::{Result, SyncError};
use crate::shared::mutation::PendingMutation;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    probe_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    version: i64,
    #[serde(default)]
    businesses: Vec<Value>,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ItinerariesResponse {
    #[serde(default)]
    itineraries: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FavoritesResponse {
    #[serde(default)]
    favorites: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    share_code: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.server_url().to_string(),
            probe_timeout: config.probe_timeout(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /api/health` under the probe deadline
    pub async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("/api/health"))
            .timeout(self.probe_timeout)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Replay one mutation against its write endpoint
    ///
    /// Returns the JSON body of the response, `Value::Null` when it is empty
    /// or not JSON.
    pub async fn send_mutation(&self, mutation: &PendingMutation) -> Result<Value> {
        let (method, path) = mutation.route();
        self.send_json(method, path, &mutation.payload.to_json()?).await
    }

    /// Send a JSON body and return the JSON response
    pub async fn send_json(&self, method: Method, path: &str, body: &Value) -> Result<Value> {
        tracing::debug!(%method, path, "Sending request");
        let response = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                // the write went through; only the body is unusable
                tracing::warn!(path, "Ignoring non-JSON response body: {}", e);
                Ok(Value::Null)
            }
        }
    }

    /// `POST /api/itinerary/{id}/publish`, returning the share code
    pub async fn publish_itinerary(&self, itinerary_id: &str) -> Result<String> {
        let path = format!("/api/itinerary/{}/publish", itinerary_id);
        let body = self
            .send_json(Method::POST, &path, &Value::Object(Default::default()))
            .await?;
        let response: PublishResponse = serde_json::from_value(body)?;
        Ok(response.share_code)
    }

    /// Fetch the business catalog and the user's lists as one snapshot
    ///
    /// All three requests must succeed; any failure fails the whole fetch.
    pub async fn fetch_snapshot(&self, user_id: &str) -> Result<CacheSnapshot> {
        let (catalog, itineraries, favorites) = tokio::try_join!(
            self.get_json::<SnapshotResponse>("/api/cache/snapshot".to_string()),
            self.get_json::<ItinerariesResponse>(format!("/api/itineraries/{}", user_id)),
            self.get_json::<FavoritesResponse>(format!("/api/favorites/{}", user_id)),
        )?;

        let last_updated_at = catalog.timestamp.unwrap_or_else(Utc::now);
        Ok(CacheSnapshot::new(catalog.version, last_updated_at)
            .with_entities(EntityKind::BusinessCatalog, into_entities(catalog.businesses))
            .with_entities(EntityKind::Itineraries, into_entities(itineraries.itineraries))
            .with_entities(EntityKind::Favorites, into_entities(favorites.favorites)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: String) -> Result<T> {
        let response = self.client.get(self.url(&path)).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Turn a non-2xx response into [`SyncError::Status`]
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::status(status, body))
}

fn into_entities(values: Vec<Value>) -> Vec<Entity> {
    values.into_iter().filter_map(Entity::from_value).collect()
}
