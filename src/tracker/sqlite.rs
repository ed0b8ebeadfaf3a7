//! SQLite-backed progress tracker

use async_trait::async_trait;
use std::sync::Arc;

use super::ProgressTracker;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{ProcessInfo, ProcessStatus, RunId};

/// Tracker persisting entries in the `publish_processes` table
///
/// Entries survive restarts, so monitoring clients can still read the outcome of
/// runs that finished before the service was restarted.
#[derive(Clone)]
pub struct SqliteTracker {
    db: Arc<Database>,
}

impl SqliteTracker {
    /// Tracker over an opened database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn not_found(id: RunId) -> Error {
        Error::NotFound(format!("process {}", id))
    }

    fn require_affected(id: RunId, affected: u64) -> Result<()> {
        if affected == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn finalize(&self, id: RunId, status: ProcessStatus, error: Option<&str>) -> Result<()> {
        let affected = self.db.finalize_process(id, status, error).await?;
        if affected == 0 && self.db.get_process(id).await?.is_none() {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressTracker for SqliteTracker {
    async fn create(&self, parent: Option<RunId>) -> Result<ProcessInfo> {
        let info = ProcessInfo::created(RunId::new(), parent);
        self.db.insert_process(&info).await?;
        Ok(info)
    }

    async fn start(&self, id: RunId) -> Result<ProcessInfo> {
        let record = self
            .db
            .get_process(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        let status = ProcessStatus::from_i32(record.status);
        if status.is_terminal() {
            return Err(Error::InvalidState {
                id,
                operation: "start".into(),
                current_state: status.to_string(),
            });
        }

        self.db.mark_process_running(id).await?;

        self.db
            .get_process(id)
            .await?
            .map(ProcessInfo::from)
            .ok_or_else(|| Self::not_found(id))
    }

    async fn get(&self, id: RunId) -> Result<Option<ProcessInfo>> {
        Ok(self.db.get_process(id).await?.map(ProcessInfo::from))
    }

    async fn set_total(&self, id: RunId, total: u64) -> Result<()> {
        let affected = self.db.update_process_total(id, total).await?;
        Self::require_affected(id, affected)
    }

    async fn set_current(&self, id: RunId, current: u64) -> Result<()> {
        let affected = self.db.update_process_current(id, current).await?;
        Self::require_affected(id, affected)
    }

    async fn finish(&self, id: RunId) -> Result<()> {
        self.finalize(id, ProcessStatus::Finished, None).await
    }

    async fn set_error(&self, id: RunId, message: &str) -> Result<()> {
        self.finalize(id, ProcessStatus::Errored, Some(message)).await
    }

    async fn cancel(&self, id: RunId) -> Result<()> {
        self.finalize(id, ProcessStatus::Cancelled, None).await
    }

    async fn list(&self) -> Result<Vec<ProcessInfo>> {
        Ok(self
            .db
            .list_processes()
            .await?
            .into_iter()
            .map(ProcessInfo::from)
            .collect())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
