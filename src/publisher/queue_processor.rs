//! Queue processor - delivers queued continuations to the publish engine.

use std::time::Duration;

use super::SnapshotPublisher;
use crate::engine::Transition;

/// Interval between queue polling attempts when the queue is empty
const QUEUE_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl SnapshotPublisher {
    /// Start the queue processor task
    ///
    /// This method spawns a background task that continuously:
    /// 1. Pops the next continuation in priority order (FIFO within a priority)
    /// 2. Acquires a permit from the worker semaphore (`publish.workers`)
    /// 3. Spawns a task handing the continuation to the engine
    /// 4. Repeats until the semaphore is closed by shutdown
    ///
    /// A run has at most one continuation in flight, since its successor is only
    /// pushed once the predecessor's page is done. Failed runs are logged and the
    /// processor keeps serving other runs.
    pub fn start_queue_processor(&self) -> tokio::task::JoinHandle<()> {
        let queue = self.queue_state.queue.clone();
        let concurrent_limit = self.queue_state.concurrent_limit.clone();
        let engine = self.engine.clone();

        tokio::spawn(async move {
            loop {
                if concurrent_limit.is_closed() {
                    tracing::debug!("Queue processor stopped");
                    break;
                }

                let Some(item) = queue.pop().await else {
                    // Queue is empty, wait a bit before checking again
                    tokio::time::sleep(QUEUE_POLL_INTERVAL).await;
                    continue;
                };

                let permit = match concurrent_limit.clone().acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => {
                        // Semaphore closed: requeue so shutdown persists it
                        queue.requeue(item).await;
                        tracing::debug!("Queue processor stopped");
                        break;
                    }
                };

                let engine = engine.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    let run_id = item.state.run_id;

                    match engine.handle_continuation(item.state).await {
                        Ok(Transition::Continued {
                            channel_index,
                            page,
                        }) => {
                            tracing::debug!(
                                run_id = %run_id,
                                channel_index,
                                page,
                                "Continuation queued"
                            );
                        }
                        Ok(Transition::Finished | Transition::Cancelled | Transition::Dropped) => {}
                        Err(e) => {
                            tracing::error!(run_id = %run_id, error = %e, "Publish run aborted");
                        }
                    }
                });
            }
        })
    }
}
