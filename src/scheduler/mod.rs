//! Cron schedules for time-triggered publishing.
//!
//! Expressions use six space-separated fields, seconds first:
//! `sec min hour day-of-month month day-of-week` (an optional seventh year field is
//! also accepted).
//!
//! # Example
//!
//! ```rust
//! use snapshot_publisher::scheduler::CronSchedule;
//!
//! // Every day at 03:00:00 UTC
//! let schedule = CronSchedule::parse("0 0 3 * * *").unwrap();
//! let next = schedule.next_after(chrono::Utc::now());
//! assert!(next.is_some());
//! ```

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed cron expression
#[derive(Clone, Debug)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl CronSchedule {
    /// Parse a cron expression
    ///
    /// Returns a configuration error keyed on `publish.start_schedule` when the
    /// expression cannot be parsed.
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let schedule = cron::Schedule::from_str(trimmed).map_err(|e| Error::Config {
            message: format!("invalid cron expression '{}': {}", trimmed, e),
            key: Some("publish.start_schedule".into()),
        })?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    /// The expression as configured
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`, if the schedule ever fires again
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// The next `count` fire times after `after`
    pub fn upcoming_after(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        self.schedule.after(&after).take(count).collect()
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl FromStr for CronSchedule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
