//! CommandRouter: dispatches decoded commands by type.
//!
//! | Command    | Destination                                        |
//! |------------|----------------------------------------------------|
//! | `POINTER`  | [`GestureEngine`] (serialized, per-pointer state)  |
//! | `TAP`      | executor directly, fire-and-forget                 |
//! | `SWIPE`    | executor directly, fire-and-forget                 |
//! | `KEYBOARD` | [`TextReconciler`]                                 |
//!
//! Taps and swipes are complete one-segment strokes, so they carry no
//! per-pointer state and skip the dispatch queue.  Their result is only
//! logged.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use touchlink_core::protocol::{PointerAction, PointerCommand, SwipeCommand, TapCommand};
use touchlink_core::{Command, Point, StrokeDescriptor, StrokeError, StrokeSynthesizer};

use super::gesture_engine::{EngineStopped, GestureConfig, GestureEngine};
use super::gesture_queue::{StrokeExecutor, StrokeOutcome};
use super::text_sync::{TextReconciler, TextSyncError};

/// Reasons a command could not be routed.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid stroke: {0}")]
    Stroke(#[from] StrokeError),
    #[error(transparent)]
    Engine(#[from] EngineStopped),
    #[error("keyboard command dropped: {0}")]
    Text(#[from] TextSyncError),
}

/// Entry point for every inbound command.
pub struct CommandRouter {
    gestures: GestureEngine,
    text: TextReconciler,
    executor: Arc<dyn StrokeExecutor>,
    synthesizer: StrokeSynthesizer,
    config: GestureConfig,
}

impl CommandRouter {
    /// Spawns the gesture engine and wires up the text reconciler.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        executor: Arc<dyn StrokeExecutor>,
        text: TextReconciler,
        config: GestureConfig,
    ) -> Self {
        Self {
            gestures: GestureEngine::spawn(Arc::clone(&executor), config),
            text,
            executor,
            synthesizer: StrokeSynthesizer::new(),
            config,
        }
    }

    pub fn gestures(&self) -> &GestureEngine {
        &self.gestures
    }

    pub fn text(&self) -> &TextReconciler {
        &self.text
    }

    /// Routes one command.
    ///
    /// # Errors
    ///
    /// [`RouteError`] when the command is dropped.  Nothing has been
    /// submitted to the host in that case.
    pub fn route(&self, command: Command) -> Result<(), RouteError> {
        debug!("routing {}", command.type_name());
        match command {
            Command::Pointer(pointer) => self.route_pointer(pointer)?,
            Command::Tap(tap) => self.route_tap(&tap)?,
            Command::Swipe(swipe) => self.route_swipe(&swipe)?,
            Command::Keyboard(keyboard) => {
                if let Err(e) = self.text.handle_keyboard(&keyboard) {
                    warn!("{:?} dropped: {e}", keyboard.action);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Drops all gesture and text state.
    ///
    /// # Errors
    ///
    /// [`RouteError::Engine`] if the gesture engine already stopped.
    pub async fn shutdown(&self) -> Result<(), RouteError> {
        self.text.clear();
        self.gestures.clear().await?;
        info!("command router cleared");
        Ok(())
    }

    fn route_pointer(&self, cmd: PointerCommand) -> Result<(), EngineStopped> {
        let at = Point::new(cmd.x, cmd.y);
        match cmd.action {
            PointerAction::Down => {
                self.gestures
                    .start_pointer(cmd.pointer_id, at, &cmd.pointer_type, cmd.duration_ms)
            }
            PointerAction::Move => {
                self.gestures
                    .move_pointer(cmd.pointer_id, at, cmd.duration_ms, true)
            }
            PointerAction::Up => {
                self.gestures
                    .move_pointer(cmd.pointer_id, at, cmd.duration_ms, false)
            }
            PointerAction::Cancel => self.gestures.cancel_pointer(cmd.pointer_id),
        }
    }

    fn route_tap(&self, tap: &TapCommand) -> Result<(), StrokeError> {
        let duration = tap.duration_ms.unwrap_or(self.config.default_tap_duration_ms);
        let stroke = self.synthesizer.tap(Point::new(tap.x, tap.y), duration)?;
        self.fire(stroke);
        Ok(())
    }

    fn route_swipe(&self, swipe: &SwipeCommand) -> Result<(), StrokeError> {
        let duration = swipe
            .duration_ms
            .unwrap_or(self.config.default_swipe_duration_ms);
        let stroke = self.synthesizer.swipe(
            Point::new(swipe.x, swipe.y),
            Point::new(swipe.x2, swipe.y2),
            duration,
        )?;
        self.fire(stroke);
        Ok(())
    }

    fn fire(&self, stroke: StrokeDescriptor) {
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            let stroke_id = stroke.stroke_id;
            match executor.execute(stroke).await {
                Ok(StrokeOutcome::Completed) => debug!("{stroke_id} completed"),
                Ok(StrokeOutcome::Cancelled) => warn!("{stroke_id} cancelled by host"),
                Err(e) => warn!("{stroke_id} not executed: {e}"),
            }
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use touchlink_core::decode_command;

    use crate::application::text_sync::TextSyncConfig;
    use crate::infrastructure::host::mock::{MockClipboard, MockStrokeExecutor, MockTextField};

    fn router(executor: &Arc<MockStrokeExecutor>, field: &Arc<MockTextField>) -> CommandRouter {
        let text = TextReconciler::new(
            field.clone(),
            Arc::new(MockClipboard::new()),
            TextSyncConfig::default(),
        );
        CommandRouter::new(executor.clone(), text, GestureConfig::default())
    }

    async fn wait_for_strokes(executor: &MockStrokeExecutor, count: usize) {
        for _ in 0..200 {
            if executor.strokes().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("expected {count} strokes, got {}", executor.strokes().len());
    }

    #[tokio::test]
    async fn test_tap_uses_default_duration_and_ends_immediately() {
        // Arrange
        let executor = Arc::new(MockStrokeExecutor::new());
        let field = Arc::new(MockTextField::new());
        let router = router(&executor, &field);

        // Act
        router
            .route(decode_command(r#"{"type":"TAP","x":540,"y":1200}"#).unwrap())
            .unwrap();
        wait_for_strokes(&executor, 1).await;

        // Assert
        let strokes = executor.strokes();
        let stroke = &strokes[0];
        assert_eq!(stroke.duration_ms, 50);
        assert!(!stroke.will_continue);
        assert!(stroke.path.is_zero_length());
    }

    #[tokio::test]
    async fn test_swipe_carries_both_points() {
        let executor = Arc::new(MockStrokeExecutor::new());
        let field = Arc::new(MockTextField::new());
        let router = router(&executor, &field);

        router
            .route(
                decode_command(r#"{"type":"SWIPE","x":10,"y":800,"x2":10,"y2":200,"durationMs":120}"#)
                    .unwrap(),
            )
            .unwrap();
        wait_for_strokes(&executor, 1).await;

        let strokes = executor.strokes();
        let stroke = &strokes[0];
        assert_eq!(stroke.path.from, Point::new(10.0, 800.0));
        assert_eq!(stroke.end_point(), Point::new(10.0, 200.0));
        assert_eq!(stroke.duration_ms, 120);
    }

    #[tokio::test]
    async fn test_tap_with_negative_coordinate_is_rejected() {
        let executor = Arc::new(MockStrokeExecutor::new());
        let field = Arc::new(MockTextField::new());
        let router = router(&executor, &field);

        let result = router.route(Command::Tap(TapCommand {
            x: -5.0,
            y: 10.0,
            duration_ms: None,
        }));

        assert!(matches!(result, Err(RouteError::Stroke(_))));
    }

    #[tokio::test]
    async fn test_pointer_commands_reach_gesture_engine() {
        let executor = Arc::new(MockStrokeExecutor::new());
        let field = Arc::new(MockTextField::new());
        let router = router(&executor, &field);

        router
            .route(decode_command(r#"{"type":"POINTER","action":"DOWN","pointerId":3,"x":1,"y":1}"#).unwrap())
            .unwrap();
        let snap = router.gestures().snapshot().await.unwrap();

        assert_eq!(snap.active_pointers, vec![3]);
    }

    #[tokio::test]
    async fn test_keyboard_command_reaches_text_reconciler() {
        let executor = Arc::new(MockStrokeExecutor::new());
        let field = Arc::new(MockTextField::new());
        let router = router(&executor, &field);

        router
            .route(decode_command(r#"{"type":"KEYBOARD","action":"INSERT_TEXT","key":"d"}"#).unwrap())
            .unwrap();
        router
            .route(decode_command(r#"{"type":"KEYBOARD","action":"INSERT_TEXT","key":"d"}"#).unwrap())
            .unwrap();
        router.text().wait_idle().await;

        assert_eq!(field.text(), "đ");
    }

    #[tokio::test]
    async fn test_rejected_keyboard_command_surfaces_error() {
        let executor = Arc::new(MockStrokeExecutor::new());
        let field = Arc::new(MockTextField::with_text("abc"));
        let router = router(&executor, &field);

        let result =
            router.route(decode_command(r#"{"type":"KEYBOARD","action":"COPY"}"#).unwrap());

        assert!(matches!(
            result,
            Err(RouteError::Text(TextSyncError::NoSelection))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_clears_gesture_state() {
        let executor = Arc::new(MockStrokeExecutor::with_delay(Duration::from_millis(20)));
        let field = Arc::new(MockTextField::new());
        let router = router(&executor, &field);
        router
            .route(decode_command(r#"{"type":"POINTER","action":"DOWN","pointerId":1,"x":1,"y":1}"#).unwrap())
            .unwrap();

        router.shutdown().await.unwrap();

        let snap = router.gestures().snapshot().await.unwrap();
        assert!(snap.active_pointers.is_empty());
    }
}
