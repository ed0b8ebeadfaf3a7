//! Background service starters - cron scheduler and startup publish.

use std::sync::Arc;

use crate::error::Result;
use crate::scheduler::CronSchedule;
use crate::scheduler_task::SchedulerTask;
use crate::types::ProcessInfo;

use super::SnapshotPublisher;

impl SnapshotPublisher {
    /// Start the cron-triggered publish task
    ///
    /// Does nothing unless `publish.enabled` is set and `publish.start_schedule`
    /// holds a cron expression.
    pub fn start_scheduler(&self) -> tokio::task::JoinHandle<()> {
        if !self.config.publish.enabled {
            tracing::info!("Publishing disabled, skipping scheduler task");
            return tokio::spawn(async {});
        }

        let Some(expression) = self.config.publish.start_schedule.clone() else {
            tracing::info!("No publish schedule configured, skipping scheduler task");
            return tokio::spawn(async {});
        };

        let schedule = match CronSchedule::parse(&expression) {
            Ok(schedule) => schedule,
            Err(e) => {
                tracing::error!(error = %e, "Invalid publish schedule");
                return tokio::spawn(async {});
            }
        };

        let task = SchedulerTask::new(Arc::new(self.clone()), schedule);
        let handle = tokio::spawn(async move {
            task.run().await;
        });

        tracing::info!(schedule = %expression, "Scheduler task started");

        handle
    }

    /// Publish every channel once, if enabled for startup
    ///
    /// Returns `Ok(None)` when `publish.enabled` or `publish.publish_on_startup` is off.
    pub async fn trigger_startup_publish(&self) -> Result<Option<ProcessInfo>> {
        if !self.config.publish.enabled || !self.config.publish.publish_on_startup {
            tracing::debug!("Startup publish disabled");
            return Ok(None);
        }

        let info = self.publish_all().await?;
        tracing::info!(run_id = %info.id, "Startup publish queued");
        Ok(Some(info))
    }
}
