//! Progress-tracker entries of publish runs.

use crate::error::DatabaseError;
use crate::types::{ProcessInfo, ProcessStatus, RunId};
use crate::{Error, Result};

use super::{Database, ProcessRecord};

const SELECT_PROCESS: &str = r#"
    SELECT id, parent_id, status, total, current, error_message,
           created_at, started_at, finished_at
    FROM publish_processes
"#;

impl Database {
    /// Insert a new process entry
    pub async fn insert_process(&self, info: &ProcessInfo) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO publish_processes (
                id, parent_id, status, total, current, error_message,
                created_at, started_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(info.id)
        .bind(info.parent_id)
        .bind(info.status.to_i32())
        .bind(info.total as i64)
        .bind(info.current as i64)
        .bind(&info.error_message)
        .bind(info.created_at.timestamp_millis())
        .bind(info.started_at.map(|t| t.timestamp_millis()))
        .bind(info.finished_at.map(|t| t.timestamp_millis()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert process: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get a process entry by id
    pub async fn get_process(&self, id: RunId) -> Result<Option<ProcessRecord>> {
        let record = sqlx::query_as::<_, ProcessRecord>(&format!("{SELECT_PROCESS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get process: {}",
                    e
                )))
            })?;

        Ok(record)
    }

    /// List every process entry, oldest first
    pub async fn list_processes(&self) -> Result<Vec<ProcessRecord>> {
        let records = sqlx::query_as::<_, ProcessRecord>(&format!(
            "{SELECT_PROCESS} ORDER BY created_at ASC, rowid ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list processes: {}",
                e
            )))
        })?;

        Ok(records)
    }

    /// List process entries that are neither finished, errored nor cancelled
    pub async fn list_unfinished_processes(&self) -> Result<Vec<ProcessRecord>> {
        let records = sqlx::query_as::<_, ProcessRecord>(&format!(
            "{SELECT_PROCESS} WHERE status IN (?, ?) ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(ProcessStatus::Created.to_i32())
        .bind(ProcessStatus::Running.to_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list unfinished processes: {}",
                e
            )))
        })?;

        Ok(records)
    }

    /// Move a non-terminal entry to running, recording the first start time
    ///
    /// Returns the number of rows changed (0 if the entry is missing or terminal).
    pub async fn mark_process_running(&self, id: RunId) -> Result<u64> {
        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            UPDATE publish_processes
            SET status = ?, started_at = COALESCE(started_at, ?)
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(ProcessStatus::Running.to_i32())
        .bind(now)
        .bind(id)
        .bind(ProcessStatus::Created.to_i32())
        .bind(ProcessStatus::Running.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark process running: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Set the channel count of a process
    pub async fn update_process_total(&self, id: RunId, total: u64) -> Result<u64> {
        let result = sqlx::query("UPDATE publish_processes SET total = ? WHERE id = ?")
            .bind(total as i64)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update process total: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }

    /// Set the current channel position of a process
    pub async fn update_process_current(&self, id: RunId, current: u64) -> Result<u64> {
        let result = sqlx::query("UPDATE publish_processes SET current = ? WHERE id = ?")
            .bind(current as i64)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update process progress: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }

    /// Move a non-terminal entry to a terminal status
    ///
    /// Returns the number of rows changed; 0 means the entry is missing or was
    /// already terminal, in which case it is left untouched.
    pub async fn finalize_process(
        &self,
        id: RunId,
        status: ProcessStatus,
        error_message: Option<&str>,
    ) -> Result<u64> {
        let now = chrono::Utc::now().timestamp_millis();
        let result = sqlx::query(
            r#"
            UPDATE publish_processes
            SET status = ?, error_message = ?, finished_at = ?
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(status.to_i32())
        .bind(error_message)
        .bind(now)
        .bind(id)
        .bind(ProcessStatus::Created.to_i32())
        .bind(ProcessStatus::Running.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to finalize process: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Delete terminal process entries that finished before `before_millis`
    pub async fn delete_processes_finished_before(&self, before_millis: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM publish_processes
            WHERE finished_at IS NOT NULL AND finished_at < ?
            "#,
        )
        .bind(before_millis)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to prune processes: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }
}
