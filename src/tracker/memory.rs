//! In-memory progress tracker

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::ProgressTracker;
use crate::error::{Error, Result};
use crate::types::{ProcessInfo, ProcessStatus, RunId};

/// Tracker that keeps entries for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryTracker {
    inner: RwLock<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<RunId, ProcessInfo>,
    order: Vec<RunId>,
}

impl MemoryTracker {
    /// Empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: RunId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ProcessInfo) + Send,
    {
        let mut inner = self.inner.write().await;
        let entry = inner
            .by_id
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("process {}", id)))?;
        apply(entry);
        Ok(())
    }

    async fn finalize(&self, id: RunId, status: ProcessStatus, error: Option<&str>) -> Result<()> {
        self.update(id, |entry| {
            if entry.status.is_terminal() {
                return;
            }
            entry.status = status;
            entry.error_message = error.map(str::to_string);
            entry.finished_at = Some(Utc::now());
        })
        .await
    }
}

#[async_trait]
impl ProgressTracker for MemoryTracker {
    async fn create(&self, parent: Option<RunId>) -> Result<ProcessInfo> {
        let info = ProcessInfo::created(RunId::new(), parent);
        let mut inner = self.inner.write().await;
        inner.order.push(info.id);
        inner.by_id.insert(info.id, info.clone());
        Ok(info)
    }

    async fn start(&self, id: RunId) -> Result<ProcessInfo> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .by_id
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("process {}", id)))?;

        if entry.status.is_terminal() {
            return Err(Error::InvalidState {
                id,
                operation: "start".into(),
                current_state: entry.status.to_string(),
            });
        }

        entry.status = ProcessStatus::Running;
        entry.started_at.get_or_insert_with(Utc::now);
        Ok(entry.clone())
    }

    async fn get(&self, id: RunId) -> Result<Option<ProcessInfo>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn set_total(&self, id: RunId, total: u64) -> Result<()> {
        self.update(id, |entry| entry.total = total).await
    }

    async fn set_current(&self, id: RunId, current: u64) -> Result<()> {
        self.update(id, |entry| entry.current = current).await
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
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
