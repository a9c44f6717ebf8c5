//! Locally generated user id, persisted under `userId`.

use super::schema::USER_ID_KEY;
use super::LocalDatabase;
use crate::shared::error::Result;
use chrono::Utc;

#[derive(Debug, Clone)]
pub struct UserIdentity {
    db: LocalDatabase,
}

impl UserIdentity {
    pub fn new(db: LocalDatabase) -> Self {
        Self { db }
    }

    /// Return the stored user id, creating `user_<millis>` on first use
    pub async fn user_id(&self) -> Result<String> {
        if let Some(id) = self.db.get(USER_ID_KEY).await? {
            return Ok(id);
        }

        let mut writer = self.db.writer().await?;
        // another task may have created it while we waited for the gate
        if let Some(id) = writer.get(USER_ID_KEY).await? {
            return Ok(id);
        }

        let id = format!("user_{}", Utc::now().timestamp_millis());
        writer.put(USER_ID_KEY, &id).await?;
        writer.commit().await?;

        tracing::info!(user_id = %id, "Generated local user id");
        Ok(id)
    }
}
