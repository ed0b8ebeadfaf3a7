//! Cancellation flags of runs that have not reached a terminal status
//!
//! The engine handles one page per call, so it never awaits a token. It reads
//! [`CancellationToken::is_cancelled`] when the next continuation arrives.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::types::RunId;

/// Shared map of live runs to their cancellation tokens (clones share the map)
#[derive(Clone, Default)]
pub struct ActiveRuns {
    tokens: Arc<Mutex<HashMap<RunId, CancellationToken>>>,
}

impl ActiveRuns {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run (an existing token is kept)
    ///
    /// The returned token is a handle for callers that want to observe the
    /// cancellation themselves; the engine only consults [`Self::is_cancelled`].
    pub async fn register(&self, run_id: RunId) -> CancellationToken {
        self.tokens
            .lock()
            .await
            .entry(run_id)
            .or_insert_with(CancellationToken::new)
            .clone()
    }

    /// Cancel the run's token, registering one first if the run had none
    pub async fn cancel(&self, run_id: RunId) {
        let mut tokens = self.tokens.lock().await;
        tokens.entry(run_id).or_insert_with(CancellationToken::new).cancel();
    }

    /// Whether the run has been cancelled
    pub async fn is_cancelled(&self, run_id: RunId) -> bool {
        self.tokens
            .lock()
            .await
            .get(&run_id)
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Forget a run once it is terminal
    pub async fn remove(&self, run_id: RunId) {
        self.tokens.lock().await.remove(&run_id);
    }

    /// Number of registered runs
    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    /// Whether no run is registered
    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_is_observed_through_registered_token() {
        let runs = ActiveRuns::new();
        let id = RunId::new();
        let token = runs.register(id).await;

        assert!(!runs.is_cancelled(id).await);
        runs.cancel(id).await;
        assert!(token.is_cancelled());
        assert!(runs.is_cancelled(id).await);

        runs.remove(id).await;
        assert!(!runs.is_cancelled(id).await);
        assert!(runs.is_empty().await);
    }

    #[tokio::test]
    async fn cancel_of_unregistered_run_registers_a_cancelled_token() {
        let runs = ActiveRuns::new();
        let id = RunId::new();

        runs.cancel(id).await;
        assert!(runs.is_cancelled(id).await);
        assert!(runs.register(id).await.is_cancelled());
        assert_eq!(runs.len().await, 1);
    }
}
