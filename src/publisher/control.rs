//! Run control - starting, cancelling and inspecting publish runs.

use crate::error::{Error, Result};
use crate::types::{ProcessInfo, RunId};

use super::SnapshotPublisher;

impl SnapshotPublisher {
    /// Publish every registered channel
    ///
    /// Returns the freshly created tracker entry; the run itself proceeds in the
    /// background once the queue processor picks it up.
    pub async fn publish_all(&self) -> Result<ProcessInfo> {
        self.orchestrator.start_all().await
    }

    /// Publish the named channels in the given order
    pub async fn publish(&self, names: Vec<String>) -> Result<ProcessInfo> {
        self.orchestrator.start(names).await
    }

    /// Names of every registered channel
    pub fn available_channels(&self) -> Vec<String> {
        self.orchestrator.available_channels()
    }

    /// Cancel a run that has not reached a terminal status
    ///
    /// The run stops when its next continuation is delivered.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown run
    /// - [`Error::InvalidState`] when the run already finished, errored or was cancelled
    pub async fn cancel(&self, id: RunId) -> Result<()> {
        self.orchestrator.cancel(id).await
    }

    /// Tracker entry of one run
    pub async fn process(&self, id: RunId) -> Result<ProcessInfo> {
        self.tracker
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("process {}", id)))
    }

    /// Every tracker entry, oldest first
    pub async fn processes(&self) -> Result<Vec<ProcessInfo>> {
        self.tracker.list().await
    }

    /// Number of continuations waiting for a worker
    pub async fn queued_continuations(&self) -> usize {
        self.queue_state.queue.len().await
    }
}
