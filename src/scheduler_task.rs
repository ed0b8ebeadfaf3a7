//! Cron-triggered publishing
//!
//! This module provides the background task that publishes every channel at each
//! fire time of the configured cron expression.
//!
//! # Example
//!
//! ```no_run
//! use snapshot_publisher::scheduler::CronSchedule;
//! use snapshot_publisher::scheduler_task::SchedulerTask;
//! use snapshot_publisher::{ChannelRegistry, Config, KeyValueSink, SnapshotPublisher};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let publisher = Arc::new(
//!     SnapshotPublisher::new(
//!         Config::default(),
//!         Arc::new(ChannelRegistry::new()),
//!         Arc::new(KeyValueSink::new()),
//!     )
//!     .await?,
//! );
//! let schedule = CronSchedule::parse("0 0 3 * * *")?;
//!
//! let task = SchedulerTask::new(publisher.clone(), schedule);
//!
//! // Run scheduler task (returns after shutdown)
//! tokio::spawn(async move {
//!     task.run().await;
//! });
//! # Ok(())
//! # }
//! ```

use crate::{SnapshotPublisher, scheduler::CronSchedule};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

/// Longest single sleep, so shutdown is noticed promptly
const MAX_SLEEP: Duration = Duration::from_secs(1);

/// Task that calls `publish_all` at every fire time of a cron schedule
pub struct SchedulerTask {
    /// Fire times
    schedule: CronSchedule,

    /// Publisher used to start runs and to check shutdown status
    publisher: Arc<SnapshotPublisher>,
}

impl SchedulerTask {
    /// Creates a new scheduler task
    pub fn new(publisher: Arc<SnapshotPublisher>, schedule: CronSchedule) -> Self {
        Self {
            schedule,
            publisher,
        }
    }

    /// Runs until the publisher stops accepting runs
    ///
    /// Each iteration waits for the next fire time, then starts a run over every
    /// channel and records the fire time in the database. A failed start is logged
    /// and the task moves on to the next fire time.
    pub async fn run(self) {
        info!(schedule = %self.schedule, "Scheduler task started");

        loop {
            let Some(fire_at) = self.schedule.next_after(Utc::now()) else {
                warn!(schedule = %self.schedule, "Schedule has no upcoming fire time");
                break;
            };
            debug!(%fire_at, "Next scheduled publish");

            if !self.sleep_until(fire_at).await {
                break;
            }

            self.fire(fire_at).await;
        }

        info!("Scheduler task stopped");
    }

    /// Sleep until `fire_at`; false when shutdown was requested meanwhile
    async fn sleep_until(&self, fire_at: DateTime<Utc>) -> bool {
        loop {
            if !self.is_running() {
                info!("Scheduler task shutting down");
                return false;
            }

            let remaining = (fire_at - Utc::now()).to_std().unwrap_or_default();
            if remaining.is_zero() {
                return true;
            }

            sleep(remaining.min(MAX_SLEEP)).await;
        }
    }

    async fn fire(&self, fire_at: DateTime<Utc>) {
        match self.publisher.publish_all().await {
            Ok(info) => {
                info!(run_id = %info.id, %fire_at, "Scheduled publish queued");
            }
            Err(e) => {
                warn!(error = %e, %fire_at, "Scheduled publish could not be started");
            }
        }

        if let Err(e) = self.publisher.db.set_last_scheduled_publish(fire_at).await {
            warn!(error = %e, "Failed to record scheduled publish time");
        }
    }

    fn is_running(&self) -> bool {
        self.publisher
            .queue_state
            .accepting_new
            .load(Ordering::SeqCst)
    }
}
