//! Core types for snapshot-publisher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier of a publish run
///
/// The same id names the progress-tracker entry and travels inside every
/// continuation of the run as its correlation id.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a fresh random run id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// Stored as TEXT (hyphenated UUID) in SQLite
impl sqlx::Type<sqlx::Sqlite> for RunId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for RunId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode(self.0.to_string(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for RunId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let text = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(Uuid::parse_str(&text)?))
    }
}

/// Lifecycle status of a publish run as seen by monitoring clients
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    /// Entry created, first page not yet processed
    Created,
    /// At least one continuation has been handled
    Running,
    /// Every channel was published
    Finished,
    /// The run aborted with an error
    Errored,
    /// The run was cancelled before completion
    Cancelled,
}

impl ProcessStatus {
    /// Convert integer status code to ProcessStatus
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => ProcessStatus::Created,
            1 => ProcessStatus::Running,
            2 => ProcessStatus::Finished,
            3 => ProcessStatus::Errored,
            4 => ProcessStatus::Cancelled,
            _ => ProcessStatus::Errored,
        }
    }

    /// Convert ProcessStatus to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            ProcessStatus::Created => 0,
            ProcessStatus::Running => 1,
            ProcessStatus::Finished => 2,
            ProcessStatus::Errored => 3,
            ProcessStatus::Cancelled => 4,
        }
    }

    /// Whether the run can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessStatus::Finished | ProcessStatus::Errored | ProcessStatus::Cancelled
        )
    }

    /// Lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Created => "created",
            ProcessStatus::Running => "running",
            ProcessStatus::Finished => "finished",
            ProcessStatus::Errored => "errored",
            ProcessStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work-queue priority of a continuation
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority (-1)
    Low = -1,
    /// Normal priority (0)
    Normal = 0,
    /// High priority (1)
    #[default]
    High = 1,
    /// Jump ahead of everything else (2)
    Force = 2,
}

impl Priority {
    /// Convert integer priority code to Priority
    pub fn from_i32(priority: i32) -> Self {
        match priority {
            -1 => Priority::Low,
            0 => Priority::Normal,
            1 => Priority::High,
            2 => Priority::Force,
            _ => Priority::Normal,
        }
    }

    /// Convert Priority to its integer code
    pub fn to_i32(&self) -> i32 {
        *self as i32
    }
}

/// Progress-tracker entry of one publish run ("longtime process")
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProcessInfo {
    /// Run id
    pub id: RunId,

    /// Parent process, if this run was spawned by another one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<RunId>,

    /// Current status
    pub status: ProcessStatus,

    /// Number of channels in the run (0 until the first page is handled)
    pub total: u64,

    /// 1-based index of the channel being published
    pub current: u64,

    /// Error message when the run errored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// When the run was created
    pub created_at: DateTime<Utc>,

    /// When the first page was handled
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

impl ProcessInfo {
    /// Build a freshly created entry
    pub fn created(id: RunId, parent_id: Option<RunId>) -> Self {
        Self {
            id,
            parent_id,
            status: ProcessStatus::Created,
            total: 0,
            current: 0,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Event emitted during the lifecycle of publish runs
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Run created and its first continuation queued
    RunQueued {
        /// Run id
        id: RunId,
        /// Channels the run will publish, in order
        channels: Vec<String>,
    },

    /// First page of the run is being handled
    RunStarted {
        /// Run id
        id: RunId,
        /// Number of channels
        total: u64,
    },

    /// One page was converted and handed to the sink
    PageUploaded {
        /// Run id
        id: RunId,
        /// Channel name
        channel: String,
        /// Zero-based page index
        page: u64,
        /// Number of objects uploaded
        objects: usize,
        /// Whether this was the last page of the channel
        final_page: bool,
    },

    /// All pages of a channel were handled
    ChannelCompleted {
        /// Run id
        id: RunId,
        /// Channel name
        channel: String,
        /// Number of pages fetched for the channel
        pages: u64,
    },

    /// Every channel was published
    RunFinished {
        /// Run id
        id: RunId,
    },

    /// The run aborted
    RunFailed {
        /// Run id
        id: RunId,
        /// Error message recorded on the tracker
        error: String,
    },

    /// The run was cancelled
    RunCancelled {
        /// Run id
        id: RunId,
    },

    /// Service is shutting down
    Shutdown,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn process_status_round_trips_through_i32() {
        let cases = [
            (ProcessStatus::Created, 0),
            (ProcessStatus::Running, 1),
            (ProcessStatus::Finished, 2),
            (ProcessStatus::Errored, 3),
            (ProcessStatus::Cancelled, 4),
        ];

        for (variant, code) in cases {
            assert_eq!(variant.to_i32(), code, "{variant:?} should encode to {code}");
            assert_eq!(ProcessStatus::from_i32(code), variant);
        }
    }

    #[test]
    fn unknown_process_status_decodes_as_errored() {
        assert_eq!(ProcessStatus::from_i32(42), ProcessStatus::Errored);
    }

    #[test]
    fn only_finished_errored_and_cancelled_are_terminal() {
        assert!(!ProcessStatus::Created.is_terminal());
        assert!(!ProcessStatus::Running.is_terminal());
        assert!(ProcessStatus::Finished.is_terminal());
        assert!(ProcessStatus::Errored.is_terminal());
        assert!(ProcessStatus::Cancelled.is_terminal());
    }

    #[test]
    fn priority_ordering_and_codes() {
        assert!(Priority::Force > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::High.to_i32(), 1);
        assert_eq!(Priority::from_i32(-1), Priority::Low);
        assert_eq!(Priority::from_i32(7), Priority::Normal);
    }

    #[test]
    fn run_id_parses_its_display_form() {
        let id = RunId::new();
        let parsed = RunId::from_str(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
        assert!(RunId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn run_id_serializes_as_plain_string() {
        let id = RunId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn events_are_tagged_with_snake_case_type() {
        let event = Event::PageUploaded {
            id: RunId::new(),
            channel: "currencies".into(),
            page: 0,
            objects: 2,
            final_page: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "page_uploaded");
        assert_eq!(json["final_page"], true);

        let shutdown = serde_json::to_value(Event::Shutdown).unwrap();
        assert_eq!(shutdown["type"], "shutdown");
    }

    #[test]
    fn created_entry_starts_empty() {
        let info = ProcessInfo::created(RunId::new(), None);
        assert_eq!(info.status, ProcessStatus::Created);
        assert_eq!(info.total, 0);
        assert_eq!(info.current, 0);
        assert!(info.started_at.is_none());
    }
}
