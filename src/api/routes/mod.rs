//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`publish`] - Starting publish runs and listing channels
//! - [`processes`] - Run progress and cancellation
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod processes;
mod publish;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use processes::*;
pub use publish::*;
pub use system::*;

/// Response for POST /processes/:id/cancel
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CancelResponse {
    /// The run the cancellation applies to
    pub id: crate::types::RunId,
    /// Always "cancellation_requested"
    pub status: String,
}

/// Response for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// "ok" while accepting runs, "shutting_down" afterwards
    pub status: String,
    /// Crate version
    pub version: String,
    /// Continuations waiting for a worker
    pub queued_continuations: usize,
}
