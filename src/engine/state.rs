//! Continuation data carried through the work queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::RunId;

/// Per-run context handed to the sink with every upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishContext {
    /// Correlation id of the run; equals the progress-tracker entry id
    pub run_id: RunId,
    /// Rows per page, fixed when the run is created
    pub batch_size: usize,
    /// True only while the last page of the current channel is being uploaded
    pub is_final_page_of_channel: bool,
    /// When the run was created
    pub started_at: DateTime<Utc>,
}

impl PublishContext {
    /// Context of a new run
    pub fn new(run_id: RunId, batch_size: usize) -> Self {
        Self {
            run_id,
            batch_size,
            is_final_page_of_channel: false,
            started_at: Utc::now(),
        }
    }
}

/// Where a publish run resumes
///
/// Each handled continuation consumes one state and produces its successor; a state
/// is never mutated after it has been queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishState {
    /// Run id
    pub run_id: RunId,
    /// Channels of the run, in publishing order (never empty)
    pub channel_names: Vec<String>,
    /// Index into `channel_names` of the channel being published
    pub current_channel_index: usize,
    /// Zero-based page within the current channel
    pub current_page: u64,
    /// Whether the most recently fetched page had no successor
    pub is_current_page_last: bool,
    /// Run context
    pub context: PublishContext,
}

impl PublishState {
    /// First continuation of a run: first channel, first page
    pub fn initial(run_id: RunId, channel_names: Vec<String>, batch_size: usize) -> Self {
        Self {
            run_id,
            channel_names,
            current_channel_index: 0,
            current_page: 0,
            is_current_page_last: false,
            context: PublishContext::new(run_id, batch_size),
        }
    }

    /// Whether this is the first continuation of the run
    pub fn is_first_step(&self) -> bool {
        self.current_channel_index == 0 && self.current_page == 0
    }

    /// Name of the channel being published
    pub fn current_channel(&self) -> Result<&str> {
        self.channel_names
            .get(self.current_channel_index)
            .map(String::as_str)
            .ok_or_else(|| {
                Error::Other(format!(
                    "continuation of run {} points at channel {} of {}",
                    self.run_id,
                    self.current_channel_index,
                    self.channel_names.len()
                ))
            })
    }

    /// Reject continuations that cannot have been produced by a run
    pub fn validate(&self) -> Result<()> {
        if self.channel_names.is_empty() {
            return Err(Error::Other(format!(
                "continuation of run {} has no channels",
                self.run_id
            )));
        }
        if self.context.run_id != self.run_id {
            return Err(Error::Other(format!(
                "continuation of run {} carries context of run {}",
                self.run_id, self.context.run_id
            )));
        }
        if self.context.batch_size == 0 {
            return Err(Error::Other(format!(
                "continuation of run {} has a zero batch size",
                self.run_id
            )));
        }
        self.current_channel().map(|_| ())
    }

    /// Successor after the current page was handled, `None` when the run is complete
    ///
    /// Stays on the channel while the page had a successor, otherwise moves to the
    /// first page of the next channel.
    pub fn advance(self) -> Option<Self> {
        if !self.is_current_page_last {
            return Some(Self {
                current_page: self.current_page + 1,
                ..self
            });
        }

        if self.current_channel_index + 1 < self.channel_names.len() {
            return Some(Self {
                current_channel_index: self.current_channel_index + 1,
                current_page: 0,
                ..self
            });
        }

        None
    }
}

/// Outcome of handling one continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The successor was queued
    Continued {
        /// Channel index of the successor
        channel_index: usize,
        /// Page of the successor
        page: u64,
    },
    /// Every channel was published and the tracker entry finished
    Finished,
    /// The run was cancelled and the tracker entry marked accordingly
    Cancelled,
    /// The run had already ended; the redelivered continuation was discarded
    Dropped,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn state(channels: &[&str]) -> PublishState {
        PublishState::initial(
            RunId::new(),
            channels.iter().map(|c| c.to_string()).collect(),
            2,
        )
    }

    #[test]
    fn initial_state_points_at_first_page_of_first_channel() {
        let s = state(&["A", "B"]);
        assert!(s.is_first_step());
        assert_eq!(s.current_channel().unwrap(), "A");
        assert_eq!(s.context.run_id, s.run_id);
        assert_eq!(s.context.batch_size, 2);
        assert!(!s.context.is_final_page_of_channel);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn advance_stays_on_channel_while_pages_remain() {
        let mut s = state(&["A", "B"]);
        s.is_current_page_last = false;

        let next = s.clone().advance().unwrap();
        assert_eq!(next.current_channel_index, 0);
        assert_eq!(next.current_page, 1);
        assert_eq!(next.run_id, s.run_id);
    }

    #[test]
    fn advance_moves_to_next_channel_after_last_page() {
        let mut s = state(&["A", "B"]);
        s.current_page = 4;
        s.is_current_page_last = true;

        let next = s.advance().unwrap();
        assert_eq!(next.current_channel_index, 1);
        assert_eq!(next.current_page, 0);
        assert!(!next.is_first_step());
    }

    #[test]
    fn advance_completes_after_last_page_of_last_channel() {
        let mut s = state(&["A", "B"]);
        s.current_channel_index = 1;
        s.is_current_page_last = true;
        assert!(s.advance().is_none());
    }

    #[test]
    fn validate_rejects_index_past_channel_list() {
        let mut s = state(&["A"]);
        s.current_channel_index = 1;
        assert!(s.validate().is_err());
        assert!(s.current_channel().is_err());
    }

    #[test]
    fn validate_rejects_empty_channel_list_and_foreign_context() {
        let empty = state(&[]);
        assert!(empty.validate().is_err());

        let mut foreign = state(&["A"]);
        foreign.context.run_id = RunId::new();
        assert!(foreign.validate().is_err());
    }

    #[test]
    fn state_survives_json_round_trip() {
        let mut s = state(&["A", "B"]);
        s.current_page = 3;
        let json = serde_json::to_string(&s).unwrap();
        let back: PublishState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
