//! Errors raised by runs, the database and the HTTP layer
//!
//! Every [`Error`] maps to an HTTP status and a stable code through
//! [`ToHttpStatus`], and converts into the [`ApiError`] response body.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::RunId;

/// Result type alias for snapshot-publisher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for snapshot-publisher
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected configuration value
    #[error("configuration error: {message}")]
    Config {
        /// What is wrong with the value
        message: String,
        /// The configuration key that caused the error (e.g., "publish.batch_size")
        key: Option<String>,
    },

    /// The requested channel set was rejected before any run was created
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A channel binding is incomplete or missing
    #[error("channel configuration error: {0}")]
    Channel(#[from] ChannelError),

    /// Progress-tracker entry or other resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// A collaborator (data source, converter, key extractor, uploader) failed
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Operation not allowed in the run's current status
    #[error("cannot {operation} run {id} in status {current_state}")]
    InvalidState {
        /// The run the operation targeted
        id: RunId,
        /// The operation that was attempted (e.g., "cancel")
        operation: String,
        /// The status that prevents the operation
        current_state: String,
    },

    /// The run exceeded its configured deadline
    #[error("run {id} timed out after {elapsed_secs}s")]
    TimedOut {
        /// The run that timed out
        id: RunId,
        /// Seconds elapsed since the run was created
        elapsed_secs: u64,
    },

    /// Shutdown in progress - not accepting new runs
    #[error("shutdown in progress: not accepting new publish runs")]
    ShuttingDown,

    /// Persistence failure with context
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Raw sqlx failure
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Incomplete channel bindings, discovered lazily when a run reaches the channel
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel name is not (or no longer) registered
    #[error("channel '{channel}' is not registered")]
    Unregistered {
        /// Channel name
        channel: String,
    },

    /// One of the binding pieces (data source, converter, key extractor) is missing
    #[error("channel '{channel}' has no {piece} bound")]
    MissingBinding {
        /// Channel name
        channel: String,
        /// Which piece is missing ("data source", "converter", "key extractor")
        piece: &'static str,
    },

    /// No sink-side descriptor exists for the channel
    #[error("channel '{channel}' has no sink descriptor")]
    MissingSink {
        /// Channel name
        channel: String,
    },
}

/// Failures raised by the collaborators the engine drives
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Fetching a page from the data source failed
    #[error("fetching page {page} of channel '{channel}' failed: {reason}")]
    Source {
        /// Channel name
        channel: String,
        /// Zero-based page index
        page: u64,
        /// Underlying failure
        reason: String,
    },

    /// Converting rows into publishable objects failed
    #[error("converting page {page} of channel '{channel}' failed: {reason}")]
    Convert {
        /// Channel name
        channel: String,
        /// Zero-based page index
        page: u64,
        /// Underlying failure
        reason: String,
    },

    /// Uploading a batch to the sink failed (includes key extraction failures)
    #[error("uploading page {page} of channel '{channel}' failed: {reason}")]
    Upload {
        /// Channel name
        channel: String,
        /// Zero-based page index
        page: u64,
        /// Underlying failure
        reason: String,
    },

    /// A single object could not be keyed
    #[error("cannot extract key: {0}")]
    KeyExtraction(String),

    /// Re-submitting the continuation to the work queue failed
    #[error("queueing continuation failed: {0}")]
    Queue(String),
}

/// Failures of the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Opening the database file or acquiring a connection
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Applying a schema version
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Any other statement
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A row the caller expected does not exist
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Body of every non-2xx API response
///
/// ```json
/// {
///   "error": {
///     "code": "invalid_request",
///     "message": "invalid request: unknown channel(s): regions"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// What went wrong
    pub error: ErrorDetail,
}

/// Code, message and optional structured context of an [`ApiError`]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable snake_case identifier (e.g., "not_found", "invalid_request")
    pub code: String,

    /// Display form of the underlying error
    pub message: String,

    /// Run id, channel, page or other context, when the error has any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn build(code: String, message: String, details: Option<serde_json::Value>) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }

    /// Error without details
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::build(code.into(), message.into(), None)
    }

    /// Error carrying structured `details`
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::build(code.into(), message.into(), Some(details))
    }

    /// `not_found` error for `resource`
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// `validation_error`, used for malformed path or body input
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// `internal_error`
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// `unauthorized`, for a missing or wrong API key
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// HTTP status and machine-readable code of an error
pub trait ToHttpStatus {
    /// Status the API answers with
    fn status_code(&self) -> u16;

    /// Value of `error.code` in the response body
    fn error_code(&self) -> &str;
}

impl Error {
    fn classify(&self) -> (u16, &'static str) {
        match self {
            Error::Config { .. } => (400, "config_error"),
            Error::InvalidRequest(_) => (400, "invalid_request"),
            Error::NotFound(_) | Error::Database(DatabaseError::NotFound(_)) => (404, "not_found"),
            Error::InvalidState { .. } => (409, "invalid_state"),
            Error::Channel(ChannelError::Unregistered { .. }) => (500, "channel_not_registered"),
            Error::Channel(ChannelError::MissingBinding { .. }) => {
                (500, "channel_binding_missing")
            }
            Error::Channel(ChannelError::MissingSink { .. }) => (500, "channel_sink_missing"),
            Error::Database(_) | Error::Sqlx(_) => (500, "database_error"),
            Error::Io(_) => (500, "io_error"),
            Error::Serialization(_) => (500, "serialization_error"),
            Error::ApiServerError(_) => (500, "api_server_error"),
            Error::Other(_) => (500, "internal_error"),
            // A collaborator failed, not the publisher itself
            Error::Upstream(upstream) => (
                502,
                match upstream {
                    UpstreamError::Source { .. } => "source_failed",
                    UpstreamError::Convert { .. } => "conversion_failed",
                    UpstreamError::Upload { .. } => "upload_failed",
                    UpstreamError::KeyExtraction(_) => "key_extraction_failed",
                    UpstreamError::Queue(_) => "queue_failed",
                },
            ),
            Error::ShuttingDown => (503, "shutting_down"),
            Error::TimedOut { .. } => (504, "timed_out"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        use serde_json::json;

        match self {
            Error::Config { key: Some(key), .. } => Some(json!({ "key": key })),
            Error::Channel(
                ChannelError::Unregistered { channel } | ChannelError::MissingSink { channel },
            ) => Some(json!({ "channel": channel })),
            Error::Channel(ChannelError::MissingBinding { channel, piece }) => {
                Some(json!({ "channel": channel, "missing": piece }))
            }
            Error::Upstream(
                UpstreamError::Source { channel, page, .. }
                | UpstreamError::Convert { channel, page, .. }
                | UpstreamError::Upload { channel, page, .. },
            ) => Some(json!({ "channel": channel, "page": page })),
            Error::InvalidState {
                id,
                operation,
                current_state,
            } => Some(json!({
                "run_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::TimedOut { id, elapsed_secs } => {
                Some(json!({ "run_id": id, "elapsed_secs": elapsed_secs }))
            }
            _ => None,
        }
    }
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        self.classify().0
    }

    fn error_code(&self) -> &str {
        self.classify().1
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::build(error.error_code().to_string(), error.to_string(), error.details())
    }
}
