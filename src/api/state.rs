//! Application state for the API server

use crate::{Config, SnapshotPublisher};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The publisher instance
    pub publisher: Arc<SnapshotPublisher>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(publisher: Arc<SnapshotPublisher>, config: Arc<Config>) -> Self {
        Self { publisher, config }
    }
}
