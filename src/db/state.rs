//! Runtime state tracking: shutdown detection and trigger bookkeeping.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::Database;

const CLEAN_SHUTDOWN_KEY: &str = "clean_shutdown";
const LAST_SCHEDULED_PUBLISH_KEY: &str = "last_scheduled_publish";

impl Database {
    /// Read a runtime state value
    pub async fn get_runtime_value(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM runtime_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to read runtime state '{}': {}",
                        key, e
                    )))
                })?;

        Ok(value)
    }

    /// Write (insert or replace) a runtime state value
    pub async fn set_runtime_value(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO runtime_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write runtime state '{}': {}",
                key, e
            )))
        })?;

        Ok(())
    }

    /// Check if the last shutdown was unclean
    ///
    /// True when the previous session never reached `set_clean_shutdown()`
    /// (crash, kill, power loss) or when no session ran before.
    pub async fn was_unclean_shutdown(&self) -> Result<bool> {
        let value = self.get_runtime_value(CLEAN_SHUTDOWN_KEY).await?;
        Ok(value.is_none_or(|v| v != "true"))
    }

    /// Mark that the service is running; called from `SnapshotPublisher::new()`
    pub async fn set_clean_start(&self) -> Result<()> {
        self.set_runtime_value(CLEAN_SHUTDOWN_KEY, "false").await
    }

    /// Mark a graceful shutdown; called from `SnapshotPublisher::shutdown()`
    pub async fn set_clean_shutdown(&self) -> Result<()> {
        self.set_runtime_value(CLEAN_SHUTDOWN_KEY, "true").await
    }

    /// Remember when the cron trigger last fired (RFC 3339)
    pub async fn set_last_scheduled_publish(&self, at: chrono::DateTime<chrono::Utc>) -> Result<()> {
        self.set_runtime_value(LAST_SCHEDULED_PUBLISH_KEY, &at.to_rfc3339())
            .await
    }

    /// When the cron trigger last fired, if ever
    pub async fn last_scheduled_publish(&self) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        let value = self.get_runtime_value(LAST_SCHEDULED_PUBLISH_KEY).await?;
        Ok(value.and_then(|v| {
            chrono::DateTime::parse_from_rfc3339(&v)
                .ok()
                .map(|t| t.with_timezone(&chrono::Utc))
        }))
    }
}
