//! Queued continuations persisted across restarts.

use sqlx::FromRow;

use crate::engine::PublishState;
use crate::error::DatabaseError;
use crate::types::Priority;
use crate::{Error, Result};

use super::Database;

#[derive(Debug, FromRow)]
struct ContinuationRow {
    priority: i32,
    state: String,
}

impl Database {
    /// Persist one queued continuation
    pub async fn save_continuation(&self, priority: Priority, state: &PublishState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO pending_continuations (run_id, priority, state, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(state.run_id)
        .bind(priority.to_i32())
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to save continuation: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Load persisted continuations in the order they were saved
    ///
    /// Rows whose state no longer deserializes are skipped with a warning.
    pub async fn load_continuations(&self) -> Result<Vec<(Priority, PublishState)>> {
        let rows = sqlx::query_as::<_, ContinuationRow>(
            "SELECT priority, state FROM pending_continuations ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load continuations: {}",
                e
            )))
        })?;

        let mut continuations = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<PublishState>(&row.state) {
                Ok(state) => continuations.push((Priority::from_i32(row.priority), state)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable persisted continuation");
                }
            }
        }

        Ok(continuations)
    }

    /// Remove every persisted continuation, returning how many were removed
    pub async fn clear_continuations(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending_continuations")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to clear continuations: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }
}
