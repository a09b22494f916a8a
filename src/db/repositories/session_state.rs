use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::{db::Database, models::SessionState};

const SESSION_KEY: &str = "current";

impl Database {
    /// Returns the raw JSON blob, if one was saved.
    pub async fn load_session_blob(&self) -> Result<Option<String>> {
        self.execute(|conn| {
            let payload = conn
                .query_row(
                    "SELECT payload FROM session_state WHERE key = ?1",
                    params![SESSION_KEY],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(payload)
        })
        .await
    }

    pub async fn save_session_blob(&self, payload: String) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO session_state (key, payload, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                params![SESSION_KEY, payload, Utc::now().to_rfc3339()],
            )
            .context("failed to upsert session state")?;
            Ok(())
        })
        .await
    }

    pub async fn load_session(&self) -> Result<Option<SessionState>> {
        match self.load_session_blob().await? {
            Some(raw) => {
                let state = serde_json::from_str(&raw).context("malformed session state blob")?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    pub async fn save_session(&self, state: &SessionState) -> Result<()> {
        let payload = serde_json::to_string(state)?;
        self.save_session_blob(payload).await
    }
}
