//! Database layer for snapshot-publisher
//!
//! Handles SQLite persistence for publish process tracking and for continuations
//! that were still queued when the service shut down.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`processes`] - Progress-tracker entries of publish runs
//! - [`continuations`] - Queued continuations persisted across restarts
//! - [`state`] - Runtime state (shutdown tracking)

use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

use crate::types::{ProcessInfo, ProcessStatus, RunId};

mod continuations;
mod migrations;
mod processes;
mod state;

/// Progress-tracker entry as stored in `publish_processes`
#[derive(Debug, Clone, FromRow)]
pub struct ProcessRecord {
    /// Run id
    pub id: RunId,
    /// Parent process id
    pub parent_id: Option<RunId>,
    /// Status code (see [`ProcessStatus::to_i32`])
    pub status: i32,
    /// Number of channels in the run
    pub total: i64,
    /// 1-based position of the channel being published
    pub current: i64,
    /// Error message of an errored run
    pub error_message: Option<String>,
    /// Unix timestamp (milliseconds) of creation
    pub created_at: i64,
    /// Unix timestamp (milliseconds) of the first handled page
    pub started_at: Option<i64>,
    /// Unix timestamp (milliseconds) of reaching a terminal status
    pub finished_at: Option<i64>,
}

impl From<ProcessRecord> for ProcessInfo {
    fn from(record: ProcessRecord) -> Self {
        ProcessInfo {
            id: record.id,
            parent_id: record.parent_id,
            status: ProcessStatus::from_i32(record.status),
            total: record.total.max(0) as u64,
            current: record.current.max(0) as u64,
            error_message: record.error_message,
            created_at: from_millis(record.created_at),
            started_at: record.started_at.map(from_millis),
            finished_at: record.finished_at.map(from_millis),
        }
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Database handle for snapshot-publisher
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
