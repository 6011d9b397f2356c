//! GestureEngine: actor task that owns the pointer tracker.
//!
//! # Why an actor? (for beginners)
//!
//! The pointer map and the dispatch queue are touched by two kinds of
//! events: commands from the network, and stroke results from the host.
//! Both can arrive at any moment on any Tokio worker thread.  Instead of
//! wrapping the state in a mutex, one task owns it and processes events one
//! at a time from a `tokio::select!` loop:
//!
//! ```text
//! GestureEngine (cloneable handle)
//!   │  EngineCommand via mpsc
//!   ▼
//! run_engine task ──► PointerTracker ──► GestureDispatchQueue ──► executor
//!   ▲                                                                │
//!   └──────────────── DispatchCompletion via mpsc ◄──────────────────┘
//! ```
//!
//! A completion makes the tracker submit the pointer's next segment, which
//! is how a drag keeps moving.  Because that happens inside the loop body,
//! there is no recursion however long the drag is.
//!
//! The task exits when every [`GestureEngine`] handle has been dropped.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use touchlink_core::{Point, PointerId};

use super::gesture_queue::{DispatchCompletion, StrokeExecutor};
use super::pointer_tracker::{PointerTracker, TrackerSnapshot, MIN_SEGMENT_DURATION_MS};

/// Tunables for the gesture side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    /// Floor applied to every pointer segment duration.
    pub min_segment_duration_ms: u64,
    /// Duration used for a `TAP` that does not specify one.
    pub default_tap_duration_ms: u64,
    /// Duration used for a `SWIPE` that does not specify one.
    pub default_swipe_duration_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_segment_duration_ms: MIN_SEGMENT_DURATION_MS,
            default_tap_duration_ms: 50,
            default_swipe_duration_ms: 300,
        }
    }
}

/// The engine task is no longer running.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("gesture engine has stopped")]
pub struct EngineStopped;

#[derive(Debug)]
enum EngineCommand {
    Start {
        pointer_id: PointerId,
        at: Point,
        pointer_type: String,
        duration_ms: u64,
    },
    Move {
        pointer_id: PointerId,
        to: Point,
        duration_ms: u64,
        will_continue: bool,
    },
    Cancel {
        pointer_id: PointerId,
    },
    Snapshot(oneshot::Sender<TrackerSnapshot>),
    Clear(oneshot::Sender<()>),
}

/// Cloneable handle to the gesture engine task.
#[derive(Debug, Clone)]
pub struct GestureEngine {
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl GestureEngine {
    /// Spawns the engine task on the current Tokio runtime.
    pub fn spawn(executor: Arc<dyn StrokeExecutor>, config: GestureConfig) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let tracker = PointerTracker::new(executor, completions_tx, config.min_segment_duration_ms);
        tokio::spawn(run_engine(tracker, inbox, completions_rx));
        Self { commands }
    }

    /// `DOWN`: touch down with pointer `pointer_id` at `at`.
    ///
    /// # Errors
    ///
    /// [`EngineStopped`] if the engine task has exited.
    pub fn start_pointer(
        &self,
        pointer_id: PointerId,
        at: Point,
        pointer_type: &str,
        duration_ms: u64,
    ) -> Result<(), EngineStopped> {
        self.send(EngineCommand::Start {
            pointer_id,
            at,
            pointer_type: pointer_type.to_string(),
            duration_ms,
        })
    }

    /// `MOVE` (`will_continue = true`) or `UP` (`false`).
    ///
    /// # Errors
    ///
    /// [`EngineStopped`] if the engine task has exited.
    pub fn move_pointer(
        &self,
        pointer_id: PointerId,
        to: Point,
        duration_ms: u64,
        will_continue: bool,
    ) -> Result<(), EngineStopped> {
        self.send(EngineCommand::Move {
            pointer_id,
            to,
            duration_ms,
            will_continue,
        })
    }

    /// `CANCEL`.
    ///
    /// # Errors
    ///
    /// [`EngineStopped`] if the engine task has exited.
    pub fn cancel_pointer(&self, pointer_id: PointerId) -> Result<(), EngineStopped> {
        self.send(EngineCommand::Cancel { pointer_id })
    }

    /// Returns the engine's current pointer and queue state.
    ///
    /// Commands sent before this call are applied before the snapshot is
    /// taken.
    ///
    /// # Errors
    ///
    /// [`EngineStopped`] if the engine task has exited.
    pub async fn snapshot(&self) -> Result<TrackerSnapshot, EngineStopped> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot(tx))?;
        rx.await.map_err(|_| EngineStopped)
    }

    /// Drops every pointer and queued task.
    ///
    /// # Errors
    ///
    /// [`EngineStopped`] if the engine task has exited.
    pub async fn clear(&self) -> Result<(), EngineStopped> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Clear(tx))?;
        rx.await.map_err(|_| EngineStopped)
    }

    fn send(&self, command: EngineCommand) -> Result<(), EngineStopped> {
        self.commands.send(command).map_err(|_| EngineStopped)
    }
}

async fn run_engine(
    mut tracker: PointerTracker,
    mut inbox: mpsc::UnboundedReceiver<EngineCommand>,
    mut completions: mpsc::UnboundedReceiver<DispatchCompletion>,
) {
    debug!("gesture engine started");
    loop {
        tokio::select! {
            command = inbox.recv() => match command {
                Some(command) => handle_command(&mut tracker, command),
                None => break,
            },
            Some(completion) = completions.recv() => {
                tracker.on_dispatch_completion(completion);
            }
        }
    }
    tracker.clear();
    info!("gesture engine stopped");
}

fn handle_command(tracker: &mut PointerTracker, command: EngineCommand) {
    match command {
        EngineCommand::Start {
            pointer_id,
            at,
            pointer_type,
            duration_ms,
        } => tracker.start_pointer(pointer_id, at, &pointer_type, duration_ms),
        EngineCommand::Move {
            pointer_id,
            to,
            duration_ms,
            will_continue,
        } => tracker.move_pointer(pointer_id, to, duration_ms, will_continue),
        EngineCommand::Cancel { pointer_id } => tracker.cancel_pointer(pointer_id),
        EngineCommand::Snapshot(reply) => {
            let _ = reply.send(tracker.snapshot());
        }
        EngineCommand::Clear(reply) => {
            tracker.clear();
            let _ = reply.send(());
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::infrastructure::host::mock::MockStrokeExecutor;

    /// Polls the engine until it has no pointers and nothing executing.
    async fn wait_until_idle(engine: &GestureEngine) {
        for _ in 0..200 {
            let snap = engine.snapshot().await.unwrap();
            if !snap.busy && snap.active_pointers.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("gesture engine did not go idle");
    }

    #[tokio::test]
    async fn test_engine_runs_a_full_drag() {
        // Arrange
        let executor = Arc::new(MockStrokeExecutor::with_delay(Duration::from_millis(1)));
        let engine = GestureEngine::spawn(executor.clone(), GestureConfig::default());

        // Act
        engine.start_pointer(1, Point::new(10.0, 10.0), "touch", 8).unwrap();
        engine.move_pointer(1, Point::new(20.0, 20.0), 8, true).unwrap();
        engine.move_pointer(1, Point::new(30.0, 30.0), 8, false).unwrap();
        wait_until_idle(&engine).await;

        // Assert
        let strokes = executor.strokes();
        assert_eq!(strokes.len(), 3);
        assert!(!strokes[2].will_continue);
        assert_eq!(executor.max_outstanding(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_reports_active_pointer() {
        let executor = Arc::new(MockStrokeExecutor::with_delay(Duration::from_millis(20)));
        let engine = GestureEngine::spawn(executor, GestureConfig::default());

        engine.start_pointer(7, Point::new(1.0, 1.0), "touch", 8).unwrap();
        let snap = engine.snapshot().await.unwrap();

        assert_eq!(snap.active_pointers, vec![7]);
        assert!(snap.busy);
    }

    #[tokio::test]
    async fn test_clear_drops_all_pointers() {
        let executor = Arc::new(MockStrokeExecutor::with_delay(Duration::from_millis(20)));
        let engine = GestureEngine::spawn(executor, GestureConfig::default());
        engine.start_pointer(1, Point::new(1.0, 1.0), "touch", 8).unwrap();
        engine.start_pointer(2, Point::new(2.0, 2.0), "touch", 8).unwrap();

        engine.clear().await.unwrap();

        assert_eq!(engine.snapshot().await.unwrap(), TrackerSnapshot::default());
    }

    #[test]
    fn test_default_config_floors_segments_at_eight_ms() {
        let cfg = GestureConfig::default();
        assert_eq!(cfg.min_segment_duration_ms, 8);
        assert_eq!(cfg.default_tap_duration_ms, 50);
        assert_eq!(cfg.default_swipe_duration_ms, 300);
    }
}
