//! # snapshot-publisher
//!
//! Publishes database-backed reference data ("channels") page by page into keyed
//! snapshot collections, tracking every run as a long-running process.
//!
//! ## Design Philosophy
//!
//! - **Bounded work per step** - A run is a chain of queued continuations, one page each
//! - **Collaborators behind traits** - Data sources, converters, key extractors and sinks are pluggable
//! - **Observable** - Every run has a tracker entry and emits events
//! - **Library-first** - Embed the publisher and optionally expose its REST API
//!
//! ## Quick Start
//!
//! ```no_run
//! use snapshot_publisher::channels::{FieldKeyExtractor, IdentityConverter, SqliteTableSource};
//! use snapshot_publisher::sink::SinkDescriptor;
//! use snapshot_publisher::{ChannelBinding, ChannelRegistry, Config, KeyValueSink, SnapshotPublisher};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::SqlitePool::connect("sqlite://reference.db").await?;
//!
//!     let registry = ChannelRegistry::new().with(
//!         ChannelBinding::new("regions")
//!             .with_source(SqliteTableSource::new(pool, "regions", "id")?)
//!             .with_converter(IdentityConverter)
//!             .with_key_extractor(FieldKeyExtractor::new("id"))
//!             .with_sink(SinkDescriptor::new("regions-cache")),
//!     )?;
//!
//!     let publisher = SnapshotPublisher::new(
//!         Config::default(),
//!         Arc::new(registry),
//!         Arc::new(KeyValueSink::new()),
//!     )
//!     .await?;
//!     publisher.start_queue_processor();
//!
//!     let run = publisher.publish_all().await?;
//!     println!("queued run {}", run.id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Channel bindings and their collaborators
pub mod channels;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Paging state machine and run orchestration
pub mod engine;
/// Error types
pub mod error;
/// Service facade (decomposed into focused submodules)
pub mod publisher;
/// Work queue of continuations
pub mod queue;
/// Cron schedule parsing
pub mod scheduler;
/// Cron-triggered publishing task
pub mod scheduler_task;
/// Upload targets
pub mod sink;
/// Progress tracking of runs
pub mod tracker;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use channels::{ChannelBinding, ChannelCatalog, ChannelRegistry};
pub use config::Config;
pub use db::Database;
pub use engine::{PublishContext, PublishEngine, PublishOrchestrator, PublishState, Transition};
pub use error::{
    ApiError, ChannelError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus, UpstreamError,
};
pub use publisher::SnapshotPublisher;
pub use queue::{PriorityQueue, WorkQueue};
pub use scheduler::CronSchedule;
pub use sink::{KeyValueSink, SinkDescriptor, SinkUploader};
pub use tracker::{MemoryTracker, ProgressTracker, SqliteTracker};
pub use types::{Event, Priority, ProcessInfo, ProcessStatus, RunId};

/// Helper function to run the publisher with graceful signal handling.
///
/// Waits for a termination signal and then calls the publisher's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use snapshot_publisher::{ChannelRegistry, Config, KeyValueSink, SnapshotPublisher, run_with_shutdown};
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
///     publisher.start_queue_processor();
///
///     // Run with automatic signal handling
///     run_with_shutdown(publisher).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(publisher: SnapshotPublisher) -> Result<()> {
    wait_for_signal().await;
    publisher.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "Shutdown signal received"),
                _ = sigint.recv() => tracing::info!(signal = "SIGINT", "Shutdown signal received"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!(signal = "SIGTERM", "Shutdown signal received");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!(signal = "SIGINT", "Shutdown signal received");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handler, using ctrl_c fallback");
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "Ctrl+C", "Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
