//! Service facade split into focused submodules.
//!
//! The `SnapshotPublisher` struct and its methods are organized by domain:
//! - [`control`] - Starting, cancelling and inspecting publish runs
//! - [`queue_processor`] - Delivery of queued continuations to the engine
//! - [`lifecycle`] - Queue restore on startup and graceful shutdown
//! - [`services`] - Cron scheduler and startup publish triggers

mod control;
mod lifecycle;
mod queue_processor;
mod services;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Semaphore, broadcast};

use crate::channels::ChannelCatalog;
use crate::config::Config;
use crate::db::Database;
use crate::engine::{ActiveRuns, PublishEngine, PublishOrchestrator};
use crate::error::Result;
use crate::queue::PriorityQueue;
use crate::sink::SinkUploader;
use crate::tracker::{ProgressTracker, SqliteTracker};
use crate::types::Event;

/// Queue and run state management
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Continuations waiting for a worker
    pub(crate) queue: PriorityQueue,
    /// Semaphore bounding concurrently handled continuations (`publish.workers`)
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Cancellation tokens of live runs
    pub(crate) active_runs: ActiveRuns,
    /// Cleared during shutdown; no run is started afterwards
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Main publisher instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct SnapshotPublisher {
    /// Database for process tracking and continuation persistence
    /// Public for integration tests to query process rows
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Queue and run state
    pub(crate) queue_state: QueueState,
    /// Progress tracker shared with the engine
    pub(crate) tracker: Arc<dyn ProgressTracker>,
    /// Entry point of runs
    pub(crate) orchestrator: PublishOrchestrator,
    /// Paging state machine
    pub(crate) engine: PublishEngine,
}

impl SnapshotPublisher {
    /// Create a new SnapshotPublisher instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Opens/creates the SQLite database and runs migrations
    /// - Wires the SQLite tracker, the in-memory priority queue, the orchestrator and the engine
    /// - Restores continuations persisted by the previous shutdown
    ///
    /// Background tasks are not started here; see
    /// [`start_queue_processor`](Self::start_queue_processor).
    pub async fn new(
        config: Config,
        catalog: Arc<dyn ChannelCatalog>,
        uploader: Arc<dyn SinkUploader>,
    ) -> Result<Self> {
        config.validate()?;
        tracing::debug!(uploader = uploader.name(), "Creating snapshot publisher");

        let db = Database::new(&config.persistence.database_path).await?;

        if db.was_unclean_shutdown().await? {
            tracing::warn!("Previous session did not shut down cleanly");
        }
        db.set_clean_start().await?;

        let publisher = Self::assemble(config, Arc::new(db), catalog, uploader);

        publisher.restore_queue().await?;

        tracing::info!(
            channels = publisher.available_channels().len(),
            tracker = publisher.tracker.name(),
            "Snapshot publisher initialized"
        );

        Ok(publisher)
    }

    /// Wire the components over an opened database
    pub(crate) fn assemble(
        config: Config,
        db: Arc<Database>,
        catalog: Arc<dyn ChannelCatalog>,
        uploader: Arc<dyn SinkUploader>,
    ) -> Self {
        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);

        let queue = PriorityQueue::new();
        let active_runs = ActiveRuns::new();
        let accepting_new = Arc::new(AtomicBool::new(true));
        let tracker: Arc<dyn ProgressTracker> = Arc::new(SqliteTracker::new(db.clone()));

        let orchestrator = PublishOrchestrator::new(
            catalog.clone(),
            tracker.clone(),
            Arc::new(queue.clone()),
            event_tx.clone(),
            config.publish.batch_size,
        )
        .with_priority(config.publish.priority)
        .with_active_runs(active_runs.clone())
        .with_accepting_flag(accepting_new.clone());

        let engine = PublishEngine::new(
            catalog,
            tracker.clone(),
            Arc::new(queue.clone()),
            uploader,
            event_tx.clone(),
        )
        .with_priority(config.publish.priority)
        .with_run_timeout(config.publish.run_timeout)
        .with_active_runs(active_runs.clone());

        let queue_state = QueueState {
            queue,
            concurrent_limit: Arc::new(Semaphore::new(config.publish.workers)),
            active_runs,
            accepting_new,
        };

        Self {
            db,
            event_tx,
            config: Arc::new(config),
            queue_state,
            tracker,
            orchestrator,
            engine,
        }
    }

    /// Subscribe to publish events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives
    /// `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use snapshot_publisher::{ChannelRegistry, Config, KeyValueSink, SnapshotPublisher};
    /// use std::sync::Arc;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let publisher = SnapshotPublisher::new(
    ///         Config::default(),
    ///         Arc::new(ChannelRegistry::new()),
    ///         Arc::new(KeyValueSink::new()),
    ///     )
    ///     .await?;
    ///
    ///     let mut events = publisher.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "publish event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers (dropped silently when nobody listens)
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:6790).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let publisher = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(publisher, config).await })
    }
}
