//! Entry point of publish runs: validation, tracker entry, first continuation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

use super::{ActiveRuns, PublishState};
use crate::channels::ChannelCatalog;
use crate::error::{Error, Result, UpstreamError};
use crate::queue::WorkQueue;
use crate::tracker::ProgressTracker;
use crate::types::{Event, Priority, ProcessInfo, RunId};

/// Starts and cancels publish runs
///
/// Validation happens before anything is created: a rejected request leaves no
/// tracker entry and pushes nothing.
#[derive(Clone)]
pub struct PublishOrchestrator {
    catalog: Arc<dyn ChannelCatalog>,
    tracker: Arc<dyn ProgressTracker>,
    queue: Arc<dyn WorkQueue>,
    event_tx: broadcast::Sender<Event>,
    batch_size: usize,
    priority: Priority,
    active_runs: ActiveRuns,
    accepting_new: Arc<AtomicBool>,
}

impl PublishOrchestrator {
    /// Orchestrator creating runs with `batch_size` rows per page
    pub fn new(
        catalog: Arc<dyn ChannelCatalog>,
        tracker: Arc<dyn ProgressTracker>,
        queue: Arc<dyn WorkQueue>,
        event_tx: broadcast::Sender<Event>,
        batch_size: usize,
    ) -> Self {
        Self {
            catalog,
            tracker,
            queue,
            event_tx,
            batch_size,
            priority: Priority::default(),
            active_runs: ActiveRuns::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Priority the first continuation is pushed at
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Share the cancellation registry with the engine
    pub fn with_active_runs(mut self, active_runs: ActiveRuns) -> Self {
        self.active_runs = active_runs;
        self
    }

    /// Share the flag that is cleared on shutdown
    pub fn with_accepting_flag(mut self, accepting_new: Arc<AtomicBool>) -> Self {
        self.accepting_new = accepting_new;
        self
    }

    /// Publish every registered channel, in registration order
    pub async fn start_all(&self) -> Result<ProcessInfo> {
        self.start(self.catalog.names()).await
    }

    /// Publish `names` in the given order
    ///
    /// Duplicates are kept and published as often as they are listed.
    pub async fn start(&self, names: Vec<String>) -> Result<ProcessInfo> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        if names.is_empty() {
            return Err(Error::InvalidRequest("channel list is empty".into()));
        }

        let mut unknown: Vec<&str> = Vec::new();
        for name in &names {
            if !self.catalog.contains(name) && !unknown.contains(&name.as_str()) {
                unknown.push(name);
            }
        }
        if !unknown.is_empty() {
            return Err(Error::InvalidRequest(format!(
                "unknown channel(s): {}",
                unknown.join(", ")
            )));
        }

        let info = self.tracker.create(None).await?;
        let run_id = info.id;
        self.active_runs.register(run_id).await;

        let state = PublishState::initial(run_id, names.clone(), self.batch_size);
        if let Err(e) = self.queue.push(self.priority, state).await {
            let error = Error::Upstream(UpstreamError::Queue(e.to_string()));
            if let Err(track_err) = self.tracker.set_error(run_id, &error.to_string()).await {
                tracing::warn!(
                    run_id = %run_id,
                    error = %track_err,
                    "Failed to record queue failure on tracker"
                );
            }
            self.active_runs.remove(run_id).await;
            return Err(error);
        }

        tracing::info!(
            run_id = %run_id,
            channels = ?names,
            batch_size = self.batch_size,
            "Publish run queued"
        );
        let _ = self.event_tx.send(Event::RunQueued {
            id: run_id,
            channels: names,
        });

        Ok(info)
    }

    /// Names of every registered channel
    pub fn available_channels(&self) -> Vec<String> {
        self.catalog.names()
    }

    /// Request cancellation of a live run
    ///
    /// The engine stops the run when it picks up its next continuation.
    pub async fn cancel(&self, run_id: RunId) -> Result<()> {
        let info = self
            .tracker
            .get(run_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("process {}", run_id)))?;

        if info.status.is_terminal() {
            return Err(Error::InvalidState {
                id: run_id,
                operation: "cancel".into(),
                current_state: info.status.to_string(),
            });
        }

        self.active_runs.cancel(run_id).await;
        tracing::info!(run_id = %run_id, "Cancellation requested");
        Ok(())
    }

    /// Whether new runs are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }
}
