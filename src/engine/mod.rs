//! Publish engine: one page of one channel per invocation.
//!
//! A run never loops in place. [`PublishEngine::handle_continuation`] consumes a
//! [`PublishState`], fetches, converts and uploads a single page, then either pushes
//! the successor state back onto the [`WorkQueue`] or finalizes the tracker entry.
//! Stack depth and task lifetime stay bounded however many pages a run has, and a
//! queued continuation can be persisted and resumed after a restart.
//!
//! ```text
//! Started -> Paging -> AdvancingChannel -> Finished | Errored | Cancelled
//! ```
//!
//! Tracker updates per run:
//! - `start` and `set_total` once, on the first continuation
//! - `set_current(index + 1)` once per channel, on its first page
//! - exactly one of `finish`, `set_error`, `cancel`
//!
//! A continuation redelivered after its run ended is dropped without touching
//! the source, the sink or the queue.

mod active_runs;
mod orchestrator;
mod state;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use active_runs::ActiveRuns;
pub use orchestrator::PublishOrchestrator;
pub use state::{PublishContext, PublishState, Transition};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::channels::{ChannelCatalog, PageRequest};
use crate::error::{ChannelError, Error, Result, UpstreamError};
use crate::queue::WorkQueue;
use crate::sink::SinkUploader;
use crate::tracker::ProgressTracker;
use crate::types::{Event, Priority, RunId};

/// The paging state machine
#[derive(Clone)]
pub struct PublishEngine {
    catalog: Arc<dyn ChannelCatalog>,
    tracker: Arc<dyn ProgressTracker>,
    queue: Arc<dyn WorkQueue>,
    uploader: Arc<dyn SinkUploader>,
    event_tx: broadcast::Sender<Event>,
    priority: Priority,
    run_timeout: Option<Duration>,
    active_runs: ActiveRuns,
}

impl PublishEngine {
    /// Engine over the given collaborators, pushing at [`Priority::High`] with no run timeout
    pub fn new(
        catalog: Arc<dyn ChannelCatalog>,
        tracker: Arc<dyn ProgressTracker>,
        queue: Arc<dyn WorkQueue>,
        uploader: Arc<dyn SinkUploader>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            catalog,
            tracker,
            queue,
            uploader,
            event_tx,
            priority: Priority::default(),
            run_timeout: None,
            active_runs: ActiveRuns::new(),
        }
    }

    /// Priority successors are pushed at
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Abort runs older than `timeout`
    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Share the cancellation registry with the orchestrator
    pub fn with_active_runs(mut self, active_runs: ActiveRuns) -> Self {
        self.active_runs = active_runs;
        self
    }

    /// Handle one delivered continuation
    ///
    /// Any error aborts the run: the tracker entry is marked errored exactly once,
    /// nothing is pushed, and the error is returned to the caller.
    pub async fn handle_continuation(&self, state: PublishState) -> Result<Transition> {
        let run_id = state.run_id;

        match self.step(state).await {
            Ok(transition) => {
                if !matches!(transition, Transition::Continued { .. }) {
                    self.active_runs.remove(run_id).await;
                }
                Ok(transition)
            }
            Err(e) => {
                self.fail(run_id, &e).await;
                Err(e)
            }
        }
    }

    async fn step(&self, state: PublishState) -> Result<Transition> {
        state.validate()?;
        let run_id = state.run_id;

        let entry = self
            .tracker
            .get(run_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("process {}", run_id)))?;
        if entry.status.is_terminal() {
            tracing::warn!(
                run_id = %run_id,
                status = %entry.status,
                channel_index = state.current_channel_index,
                page = state.current_page,
                "Dropping continuation of an ended run"
            );
            return Ok(Transition::Dropped);
        }

        if self.active_runs.is_cancelled(run_id).await {
            self.tracker.cancel(run_id).await?;
            tracing::info!(run_id = %run_id, "Publish run cancelled");
            self.emit(Event::RunCancelled { id: run_id });
            return Ok(Transition::Cancelled);
        }

        if let Some(limit) = self.run_timeout {
            let elapsed = (Utc::now() - state.context.started_at)
                .to_std()
                .unwrap_or_default();
            if elapsed > limit {
                return Err(Error::TimedOut {
                    id: run_id,
                    elapsed_secs: elapsed.as_secs(),
                });
            }
        }

        match self.process_page(state).await? {
            Some(next) => {
                let channel_index = next.current_channel_index;
                let page = next.current_page;
                self.queue
                    .push(self.priority, next)
                    .await
                    .map_err(|e| UpstreamError::Queue(e.to_string()))?;
                Ok(Transition::Continued {
                    channel_index,
                    page,
                })
            }
            None => {
                self.tracker.finish(run_id).await?;
                tracing::info!(run_id = %run_id, "Publish run finished");
                self.emit(Event::RunFinished { id: run_id });
                Ok(Transition::Finished)
            }
        }
    }

    /// Fetch, convert and upload the state's page, returning the successor state
    ///
    /// `None` means every channel of the run has been published. Nothing is pushed
    /// and the tracker entry is not finalized here.
    pub async fn process_page(&self, mut state: PublishState) -> Result<Option<PublishState>> {
        let run_id = state.run_id;
        let index = state.current_channel_index;
        let page = state.current_page;

        if state.is_first_step() {
            let total = state.channel_names.len() as u64;
            self.tracker.start(run_id).await?;
            self.tracker.set_total(run_id, total).await?;
            tracing::info!(run_id = %run_id, total, "Publish run started");
            self.emit(Event::RunStarted { id: run_id, total });
        }

        if page == 0 {
            self.tracker.set_current(run_id, index as u64 + 1).await?;
        }

        let channel = state.current_channel()?.to_string();
        let binding = self
            .catalog
            .get(&channel)
            .ok_or_else(|| ChannelError::Unregistered {
                channel: channel.clone(),
            })?;
        let resolved = binding.resolve()?;

        let fetched = resolved
            .source
            .find_page(PageRequest::new(page, state.context.batch_size))
            .await
            .map_err(|e| UpstreamError::Source {
                channel: channel.clone(),
                page,
                reason: e.to_string(),
            })?;

        // total_pages == 0: empty channel, treated as a single exhausted page
        let has_next = fetched.has_next && fetched.total_pages > 0;
        tracing::debug!(
            run_id = %run_id,
            channel = %channel,
            page,
            rows = fetched.rows.len(),
            total_pages = fetched.total_pages,
            has_next,
            "Fetched page"
        );

        let objects = resolved
            .converter
            .convert(fetched.rows)
            .map_err(|e| UpstreamError::Convert {
                channel: channel.clone(),
                page,
                reason: e.to_string(),
            })?;

        if !objects.is_empty() {
            let count = objects.len();
            let final_page = !has_next;

            state.context.is_final_page_of_channel = final_page;
            let result = self
                .uploader
                .upload(
                    &resolved.sink,
                    objects,
                    resolved.key_extractor.as_ref(),
                    true,
                    &state.context,
                )
                .await;
            state.context.is_final_page_of_channel = false;

            let report = result.map_err(|e| UpstreamError::Upload {
                channel: channel.clone(),
                page,
                reason: e.to_string(),
            })?;

            tracing::info!(
                run_id = %run_id,
                channel = %channel,
                page,
                objects = count,
                written = report.written,
                final_page,
                swapped = report.swapped,
                "Uploaded page"
            );
            self.emit(Event::PageUploaded {
                id: run_id,
                channel: channel.clone(),
                page,
                objects: count,
                final_page,
            });
        }

        state.is_current_page_last = !has_next;
        if !has_next {
            tracing::info!(
                run_id = %run_id,
                channel = %channel,
                pages = page + 1,
                "Channel published"
            );
            self.emit(Event::ChannelCompleted {
                id: run_id,
                channel,
                pages: page + 1,
            });
        }

        Ok(state.advance())
    }

    async fn fail(&self, run_id: RunId, error: &Error) {
        let message = error.to_string();
        tracing::error!(run_id = %run_id, error = %message, "Publish run failed");

        if let Err(e) = self.tracker.set_error(run_id, &message).await {
            tracing::warn!(
                run_id = %run_id,
                error = %e,
                "Failed to record run failure on tracker"
            );
        }

        self.active_runs.remove(run_id).await;
        self.emit(Event::RunFailed {
            id: run_id,
            error: message,
        });
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
