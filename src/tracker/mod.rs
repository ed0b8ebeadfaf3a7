//! Progress tracking of publish runs ("longtime processes").
//!
//! Every run owns one tracker entry, created by the orchestrator before the first
//! page and finalized exactly once by the engine (finished, errored or cancelled).
//! Finalizing an entry that is already terminal is a no-op, so a redelivered
//! continuation cannot overwrite the outcome of a run.

mod memory;
mod sqlite;

pub use memory::MemoryTracker;
pub use sqlite::SqliteTracker;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ProcessInfo, RunId};

/// Store of run progress visible to monitoring clients
#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Create an entry in status `created` with zero progress
    async fn create(&self, parent: Option<RunId>) -> Result<ProcessInfo>;

    /// Move `created` to `running`
    ///
    /// Fails with `NotFound` for an unknown id and `InvalidState` for a terminal entry.
    async fn start(&self, id: RunId) -> Result<ProcessInfo>;

    /// Current entry, if any
    async fn get(&self, id: RunId) -> Result<Option<ProcessInfo>>;

    /// Set the number of channels in the run
    async fn set_total(&self, id: RunId, total: u64) -> Result<()>;

    /// Set the 1-based position of the channel being published
    async fn set_current(&self, id: RunId, current: u64) -> Result<()>;

    /// Mark the run finished
    async fn finish(&self, id: RunId) -> Result<()>;

    /// Mark the run errored with `message`
    async fn set_error(&self, id: RunId, message: &str) -> Result<()>;

    /// Mark the run cancelled
    async fn cancel(&self, id: RunId) -> Result<()>;

    /// Every entry, oldest first
    async fn list(&self) -> Result<Vec<ProcessInfo>>;

    /// Human-readable name for logs
    fn name(&self) -> &'static str;
}
