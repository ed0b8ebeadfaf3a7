//! Work queue for publish continuations.
//!
//! The engine never loops over pages itself: after each page it pushes the
//! successor state back onto a [`WorkQueue`], and the queue processor later hands
//! it to a worker. [`PriorityQueue`] is the in-process implementation, ordered by
//! priority and FIFO within a priority.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tokio::sync::Mutex;

use crate::engine::PublishState;
use crate::error::Result;
use crate::types::{Priority, RunId};

/// Accepts continuations for later delivery
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue `state` at `priority`
    async fn push(&self, priority: Priority, state: PublishState) -> Result<()>;
}

/// A continuation waiting in the [`PriorityQueue`]
#[derive(Debug, Clone)]
pub struct QueuedContinuation {
    /// Delivery priority
    pub priority: Priority,
    /// Insertion order, used for FIFO tie-breaking
    pub sequence: u64,
    /// The continuation itself
    pub state: PublishState,
}

impl PartialEq for QueuedContinuation {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedContinuation {}

// BinaryHeap is a max-heap: higher priority first, then lower sequence first
impl Ord for QueuedContinuation {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ordering => ordering,
        }
    }
}

impl PartialOrd for QueuedContinuation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// In-memory priority queue (cloneable, clones share the same heap)
#[derive(Clone, Default)]
pub struct PriorityQueue {
    heap: Arc<Mutex<BinaryHeap<QueuedContinuation>>>,
    sequence: Arc<AtomicU64>,
}

impl PriorityQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next continuation to deliver
    pub async fn pop(&self) -> Option<QueuedContinuation> {
        self.heap.lock().await.pop()
    }

    /// Put a popped continuation back, keeping its original place
    pub async fn requeue(&self, item: QueuedContinuation) {
        self.heap.lock().await.push(item);
    }

    /// Number of waiting continuations
    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    /// Whether nothing is waiting
    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }

    /// Remove every waiting continuation, in delivery order
    pub async fn drain(&self) -> Vec<QueuedContinuation> {
        let mut heap = self.heap.lock().await;
        let mut drained = Vec::with_capacity(heap.len());
        while let Some(item) = heap.pop() {
            drained.push(item);
        }
        drained
    }

    /// Drop the waiting continuations of one run, returning how many were removed
    pub async fn remove_run(&self, run_id: RunId) -> usize {
        let mut heap = self.heap.lock().await;
        let before = heap.len();
        heap.retain(|item| item.state.run_id != run_id);
        before - heap.len()
    }
}

#[async_trait]
impl WorkQueue for PriorityQueue {
    async fn push(&self, priority: Priority, state: PublishState) -> Result<()> {
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::SeqCst);
        tracing::debug!(
            run_id = %state.run_id,
            channel_index = state.current_channel_index,
            page = state.current_page,
            ?priority,
            "Queued continuation"
        );
        self.heap.lock().await.push(QueuedContinuation {
            priority,
            sequence,
            state,
        });
        Ok(())
    }
}
