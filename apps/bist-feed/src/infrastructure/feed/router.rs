//! Message Router
//!
//! Classifies each complete line by its type code and enqueues it on the
//! owning worker queue. The body is never inspected here.

use std::sync::Arc;

use super::protocol::{FeedLine, QueueKind};
use super::state::FeedState;
use super::workers::WorkerPool;
use crate::infrastructure::metrics;

/// Routes complete lines to worker queues.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    workers: Arc<WorkerPool>,
    state: Option<Arc<FeedState>>,
}

impl MessageRouter {
    /// Create a router over a worker pool.
    #[must_use]
    pub const fn new(workers: Arc<WorkerPool>) -> Self {
        Self {
            workers,
            state: None,
        }
    }

    /// Count routed lines in `state`.
    #[must_use]
    pub fn with_state(mut self, state: Arc<FeedState>) -> Self {
        self.state = Some(state);
        self
    }

    /// Route one line.
    ///
    /// Returns the queue it was enqueued on, or `None` if the worker pool
    /// has shut down.
    pub fn route(&self, line: &str) -> Option<QueueKind> {
        let line = FeedLine::classify(line);
        let queue = line.queue();

        metrics::record_line(line.message_type);
        if let Some(state) = &self.state {
            state.increment_lines();
        }
        if line.unknown_reason.is_some() {
            tracing::debug!(
                queue = queue.as_str(),
                reason = ?line.unknown_reason,
                raw = %line.raw,
                "Line routed to unknown queue"
            );
        }

        if self.workers.dispatch(queue, line) {
            Some(queue)
        } else {
            tracing::trace!(queue = queue.as_str(), "Worker pool stopped, line dropped");
            None
        }
    }
}
