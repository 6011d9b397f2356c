//! GestureDispatchQueue: strict FIFO in front of the host stroke executor.
//!
//! The host input-injection API accepts only **one gesture at a time across
//! the whole system**.  Submitting a second stroke while one is running makes
//! the host cancel the first.  Every stroke the agent produces therefore
//! passes through this queue, which starts the head task only after the
//! previous task's result has come back.
//!
//! # How completion flows (for beginners)
//!
//! ```text
//! enqueue(task) ──► pending ──► process_next() ──► tokio::spawn(executor.execute)
//!                                                         │
//!         complete(DispatchCompletion) ◄── mpsc channel ◄─┘
//!                │
//!                ├─ on_result(completed)   (task's own callback, exactly once)
//!                └─ process_next()          (start the next head, if any)
//! ```
//!
//! The queue never awaits anything itself.  The executor future runs on its
//! own task and reports back through an unbounded channel whose receiver is
//! owned by the gesture engine actor.  The actor calls [`GestureDispatchQueue::complete`]
//! when a message arrives, so all queue state is touched from one task only.
//!
//! Each started task gets a *ticket*.  A completion carrying a ticket other
//! than the in-flight one (for example one that raced with [`GestureDispatchQueue::clear`])
//! is ignored.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use touchlink_core::{Point, PointerId, StrokeDescriptor};

/// Error returned by a host executor that refuses a stroke outright.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The host rejected the stroke before starting it.
    #[error("host rejected the stroke: {0}")]
    Rejected(String),
    /// The host input service is not connected.
    #[error("host input service unavailable")]
    Unavailable,
}

/// How a stroke that the host accepted finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeOutcome {
    Completed,
    Cancelled,
}

/// Host capability that performs one stroke segment.
///
/// Implementations resolve once the host reports the stroke finished.
/// Returning `Err` is treated exactly like [`StrokeOutcome::Cancelled`].
#[async_trait]
pub trait StrokeExecutor: Send + Sync {
    async fn execute(&self, stroke: StrokeDescriptor) -> Result<StrokeOutcome, ExecutorError>;
}

/// Callback invoked with `true` when the task's stroke completed.
pub type ResultCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// One unit of work for the executor.
pub struct GestureTask {
    pub pointer_id: PointerId,
    pub stroke: StrokeDescriptor,
    pub end: Point,
    pub will_continue: bool,
    on_result: ResultCallback,
}

impl GestureTask {
    pub fn new(
        pointer_id: PointerId,
        stroke: StrokeDescriptor,
        on_result: impl FnOnce(bool) + Send + 'static,
    ) -> Self {
        Self {
            pointer_id,
            end: stroke.end_point(),
            will_continue: stroke.will_continue,
            stroke,
            on_result: Box::new(on_result),
        }
    }
}

impl std::fmt::Debug for GestureTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureTask")
            .field("pointer_id", &self.pointer_id)
            .field("stroke", &self.stroke)
            .field("will_continue", &self.will_continue)
            .finish_non_exhaustive()
    }
}

/// Result message sent by an executor task back to the queue owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchCompletion {
    ticket: u64,
    completed: bool,
}

impl DispatchCompletion {
    pub fn completed(&self) -> bool {
        self.completed
    }
}

struct InFlight {
    ticket: u64,
    pointer_id: PointerId,
    on_result: ResultCallback,
}

/// Single-flight FIFO of [`GestureTask`]s.
pub struct GestureDispatchQueue {
    pending: VecDeque<GestureTask>,
    in_flight: Option<InFlight>,
    executor: Arc<dyn StrokeExecutor>,
    completions: mpsc::UnboundedSender<DispatchCompletion>,
    next_ticket: u64,
}

impl GestureDispatchQueue {
    /// Creates an idle queue.  Completions are delivered on `completions`;
    /// the owner must feed them back through [`Self::complete`].
    pub fn new(
        executor: Arc<dyn StrokeExecutor>,
        completions: mpsc::UnboundedSender<DispatchCompletion>,
    ) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: None,
            executor,
            completions,
            next_ticket: 1,
        }
    }

    /// Appends `task`; starts it immediately if nothing is executing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue(&mut self, task: GestureTask) {
        debug!(
            "enqueue pointer {} {} segment {}",
            task.pointer_id, task.stroke.stroke_id, task.stroke.segment
        );
        self.pending.push_back(task);
        self.process_next();
    }

    /// Starts the head task unless one is already executing.
    fn process_next(&mut self) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(task) = self.pending.pop_front() else {
            return;
        };

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let GestureTask {
            pointer_id,
            stroke,
            on_result,
            ..
        } = task;
        self.in_flight = Some(InFlight {
            ticket,
            pointer_id,
            on_result,
        });

        let executor = Arc::clone(&self.executor);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let stroke_id = stroke.stroke_id;
            let completed = match executor.execute(stroke).await {
                Ok(StrokeOutcome::Completed) => true,
                Ok(StrokeOutcome::Cancelled) => {
                    debug!("{stroke_id} cancelled by host");
                    false
                }
                Err(e) => {
                    warn!("{stroke_id} not executed: {e}");
                    false
                }
            };
            // The receiver is gone only after the engine shut down.
            let _ = completions.send(DispatchCompletion { ticket, completed });
        });
    }

    /// Applies an executor result: invokes the task's callback and starts the
    /// next queued task.  Returns `false` for a stale completion.
    pub fn complete(&mut self, completion: DispatchCompletion) -> bool {
        match self.in_flight.take() {
            Some(flight) if flight.ticket == completion.ticket => {
                (flight.on_result)(completion.completed);
                self.process_next();
                true
            }
            other => {
                debug!("ignoring stale completion (ticket {})", completion.ticket);
                self.in_flight = other;
                false
            }
        }
    }

    /// Removes every queued (not yet started) task of `pointer_id`.
    ///
    /// An executing task is left alone.  Purged callbacks are never invoked.
    pub fn purge_tasks(&mut self, pointer_id: PointerId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|t| t.pointer_id != pointer_id);
        let purged = before - self.pending.len();
        if purged > 0 {
            debug!("purged {purged} queued task(s) of pointer {pointer_id}");
        }
        purged
    }

    /// Drops all queued tasks and forgets the executing one.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight = None;
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of tasks waiting behind the executing one.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_executing(&self, pointer_id: PointerId) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| f.pointer_id == pointer_id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
