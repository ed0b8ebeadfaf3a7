//! Startup restore and shutdown coordination.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::Result;
use crate::queue::WorkQueue;
use crate::types::{Event, RunId};

use super::SnapshotPublisher;

/// Upper bound on waiting for in-flight continuations during shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl SnapshotPublisher {
    /// Gracefully shut down the publisher
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new runs (triggers and API calls get `ShuttingDown`)
    /// 2. Closes the worker semaphore so no further continuation is started
    /// 3. Waits for in-flight continuations to complete with a timeout (30 seconds)
    /// 4. Persists queued continuations to the database, to be resumed on next start
    /// 5. Marks a clean shutdown and emits [`Event::Shutdown`]
    ///
    /// Runs are not cancelled: they resume where they stopped after a restart.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new runs
        self.queue_state
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new publish runs");

        // 2. Stop handing out worker permits
        self.queue_state.concurrent_limit.close();

        // 3. Wait for in-flight continuations
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_in_flight()).await {
            Ok(()) => tracing::info!("All in-flight continuations completed"),
            Err(_) => tracing::warn!(
                "Timeout waiting for in-flight continuations, proceeding with shutdown"
            ),
        }

        // 4. Persist what is still queued
        if let Err(e) = self.persist_queue().await {
            tracing::error!(error = %e, "Failed to persist queued continuations during shutdown");
            // Continue with shutdown even if persistence fails
        }

        // 5. Mark clean shutdown in database
        if let Err(e) = self.db.set_clean_shutdown().await {
            tracing::error!(error = %e, "Failed to mark clean shutdown in database");
        } else {
            tracing::info!("Marked clean shutdown in database");
        }

        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Wait until every worker permit has been returned
    async fn wait_for_in_flight(&self) {
        let workers = self.config.publish.workers;
        loop {
            let available = self.queue_state.concurrent_limit.available_permits();
            if available >= workers {
                return;
            }

            tracing::debug!(
                in_flight = workers.saturating_sub(available),
                "Waiting for in-flight continuations to complete"
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Move queued continuations into the database
    ///
    /// Continuations of runs that were cancelled while queued are not persisted;
    /// their tracker entries are marked cancelled right away.
    pub(crate) async fn persist_queue(&self) -> Result<()> {
        let drained = self.queue_state.queue.drain().await;
        let mut persisted = 0usize;

        for item in drained {
            let run_id = item.state.run_id;

            if self.queue_state.active_runs.is_cancelled(run_id).await {
                self.tracker.cancel(run_id).await?;
                self.queue_state.active_runs.remove(run_id).await;
                self.emit_event(Event::RunCancelled { id: run_id });
                continue;
            }

            self.db.save_continuation(item.priority, &item.state).await?;
            persisted += 1;
        }

        if persisted > 0 {
            tracing::info!(persisted, "Persisted queued continuations for resume on restart");
        } else {
            tracing::debug!("No queued continuations to persist");
        }

        Ok(())
    }

    /// Re-queue continuations persisted by the previous shutdown
    ///
    /// Runs that were still live but left no continuation behind (crash, or a
    /// continuation in flight when the shutdown timeout hit) can no longer make
    /// progress and are marked errored.
    pub(crate) async fn restore_queue(&self) -> Result<()> {
        let continuations = self.db.load_continuations().await?;
        self.db.clear_continuations().await?;

        let mut resumed: HashSet<RunId> = HashSet::new();
        for (priority, state) in continuations {
            let run_id = state.run_id;
            self.queue_state.active_runs.register(run_id).await;
            self.queue_state.queue.push(priority, state).await?;
            resumed.insert(run_id);
        }

        let mut interrupted = 0usize;
        for record in self.db.list_unfinished_processes().await? {
            if resumed.contains(&record.id) {
                continue;
            }
            self.tracker
                .set_error(record.id, "interrupted before completion")
                .await?;
            interrupted += 1;
            tracing::warn!(run_id = %record.id, "Publish run interrupted by restart, marked errored");
        }

        if !resumed.is_empty() || interrupted > 0 {
            tracing::info!(
                resumed = resumed.len(),
                interrupted,
                "Restored publish queue from previous session"
            );
        }

        Ok(())
    }
}
