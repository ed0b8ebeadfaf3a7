//! Configuration types for snapshot-publisher

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;

use crate::error::{Error, Result};
use crate::scheduler::CronSchedule;
use crate::types::Priority;

/// Main configuration for [`SnapshotPublisher`](crate::SnapshotPublisher)
///
/// Every field has a default, so an empty JSON object deserializes into a usable
/// configuration with publishing triggers switched off.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Publish run behavior (batching, triggers, queue priority, workers)
    #[serde(default)]
    pub publish: PublishConfig,

    /// Data storage for process tracking and queued continuations
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// HTTP surface
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Check settings that would otherwise fail at run time
    pub fn validate(&self) -> Result<()> {
        if self.publish.batch_size == 0 {
            return Err(Error::Config {
                message: "batch size must be greater than zero".into(),
                key: Some("publish.batch_size".into()),
            });
        }

        if self.publish.workers == 0 {
            return Err(Error::Config {
                message: "at least one worker is required".into(),
                key: Some("publish.workers".into()),
            });
        }

        if let Some(timeout) = self.publish.run_timeout
            && timeout.is_zero()
        {
            return Err(Error::Config {
                message: "run timeout must be greater than zero when set".into(),
                key: Some("publish.run_timeout".into()),
            });
        }

        if let Some(expression) = &self.publish.start_schedule {
            CronSchedule::parse(expression)?;
        }

        Ok(())
    }
}

/// Publish run behavior
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PublishConfig {
    /// Master switch for the automatic triggers (cron schedule and startup publish)
    ///
    /// Only the triggers are gated. The REST routes and [`crate::SnapshotPublisher`]
    /// methods keep accepting runs when this is `false`.
    #[serde(default)]
    pub enabled: bool,

    /// Rows fetched per page (default: 1000)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Cron expression (seconds minutes hours day-of-month month day-of-week)
    /// that triggers a publish of every channel
    #[serde(default)]
    pub start_schedule: Option<String>,

    /// Publish every channel once when the service starts (default: true)
    #[serde(default = "default_true")]
    pub publish_on_startup: bool,

    /// Work-queue priority of every continuation (default: high)
    #[serde(default)]
    pub priority: Priority,

    /// Continuations handled concurrently across runs (default: 1)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Abort a run once it has been alive longer than this (seconds, default: unlimited)
    #[serde(default, with = "optional_duration_serde")]
    #[schema(value_type = Option<u64>)]
    pub run_timeout: Option<Duration>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: default_batch_size(),
            start_schedule: None,
            publish_on_startup: true,
            priority: Priority::default(),
            workers: default_workers(),
            run_timeout: None,
        }
    }
}

/// Data storage settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./snapshot-publisher.db")
    #[serde(default = "default_database_path")]
    #[schema(value_type = String)]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Settings of the embedded HTTP server
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// Routes, authentication and CORS
    #[serde(default)]
    pub api: ApiConfig,
}

/// How the REST API is exposed
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// When set, every route except `/health` requires this value in `X-Api-Key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Answer CORS preflights (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Origins allowed by CORS; `"*"` allows any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve Swagger UI under `/swagger-ui` (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    1000
}

fn default_workers() -> usize {
    1
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./snapshot-publisher.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Optional Duration serialization helper (whole seconds)
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
