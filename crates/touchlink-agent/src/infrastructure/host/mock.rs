//! In-memory host adapters.
//!
//! # Why in-memory adapters?
//!
//! The real adapters talk to the device's accessibility / input-injection
//! service, which:
//!
//! - only exists on the device itself,
//! - actually touches the screen and edits whatever field has focus,
//! - cannot be observed from Rust test code.
//!
//! These adapters replace every host call with simple recording.  Each
//! stroke, write and selection change is pushed into a `Mutex<Vec<...>>` so
//! test assertions can inspect exactly what was sent and in what order.
//! The agent binary also runs on them until a device adapter is plugged in.
//!
//! # Scripting failures
//!
//! - [`MockStrokeExecutor::push_outcome`] queues the result of the next
//!   stroke (completed, cancelled, or rejected).
//! - [`MockTextField::set_available`] simulates "no focused field".
//! - [`MockTextField::set_reject_writes`] makes writes fail.
//! - [`MockTextField::set_lagging`] records writes without applying them,
//!   like a field that has not caught up yet.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use touchlink_core::{char_len, StrokeDescriptor};

use crate::application::gesture_queue::{ExecutorError, StrokeExecutor, StrokeOutcome};
use crate::application::text_sync::{ClipboardAccessor, FieldSnapshot, TextFieldAccessor};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Stroke executor ───────────────────────────────────────────────────────────

/// Executor that records every stroke and completes it after `delay`.
#[derive(Default)]
pub struct MockStrokeExecutor {
    strokes: Mutex<Vec<StrokeDescriptor>>,
    outcomes: Mutex<VecDeque<Result<StrokeOutcome, ExecutorError>>>,
    outstanding: AtomicUsize,
    max_outstanding: AtomicUsize,
    delay: Duration,
}

impl MockStrokeExecutor {
    /// Completes every stroke on the next scheduler turn.
    pub fn new() -> Self {
        Self::default()
    }

    /// Completes every stroke after `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Scripts the result of the next un-scripted stroke.  `Err` results are
    /// returned immediately, without the delay.
    pub fn push_outcome(&self, outcome: Result<StrokeOutcome, ExecutorError>) {
        lock(&self.outcomes).push_back(outcome);
    }

    /// Every stroke handed to the executor, in call order.
    pub fn strokes(&self) -> Vec<StrokeDescriptor> {
        lock(&self.strokes).clone()
    }

    /// Highest number of strokes that were executing at the same time.
    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StrokeExecutor for MockStrokeExecutor {
    async fn execute(&self, stroke: StrokeDescriptor) -> Result<StrokeOutcome, ExecutorError> {
        debug!(
            "mock executor: {} segment {} ({} ms)",
            stroke.stroke_id, stroke.segment, stroke.duration_ms
        );
        lock(&self.strokes).push(stroke);
        let scripted = lock(&self.outcomes).pop_front();
        let outcome = match scripted {
            Some(Err(e)) => return Err(e),
            Some(Ok(outcome)) => outcome,
            None => StrokeOutcome::Completed,
        };

        let running = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(running, Ordering::SeqCst);
        if self.delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delay).await;
        }
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        Ok(outcome)
    }
}

// ── Text field ────────────────────────────────────────────────────────────────

/// A text field held in memory.
pub struct MockTextField {
    field: Mutex<FieldSnapshot>,
    available: AtomicBool,
    lagging: AtomicBool,
    reject_writes: AtomicBool,
    writes: Mutex<Vec<String>>,
    selections: Mutex<Vec<(usize, usize)>>,
}

impl MockTextField {
    /// An empty, focused field.
    pub fn new() -> Self {
        Self::with_text("")
    }

    /// A focused field holding `text` with the caret at the end.
    pub fn with_text(text: &str) -> Self {
        Self {
            field: Mutex::new(FieldSnapshot::new(text)),
            available: AtomicBool::new(true),
            lagging: AtomicBool::new(false),
            reject_writes: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
            selections: Mutex::new(Vec::new()),
        }
    }

    /// Selects `start..end` as if the local user dragged over it.
    pub fn select(&self, start: usize, end: usize) {
        let mut field = lock(&self.field);
        field.selection_start = start;
        field.selection_end = end;
    }

    /// Replaces the content without recording a write.
    pub fn set_text_externally(&self, text: &str) {
        let mut field = lock(&self.field);
        let hint = field.hint.take();
        *field = FieldSnapshot {
            hint,
            ..FieldSnapshot::new(text)
        };
    }

    pub fn set_hint(&self, hint: &str) {
        lock(&self.field).hint = Some(hint.to_string());
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_lagging(&self, lagging: bool) {
        self.lagging.store(lagging, Ordering::SeqCst);
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn text(&self) -> String {
        lock(&self.field).text.clone()
    }

    /// Every accepted write, in order.
    pub fn writes(&self) -> Vec<String> {
        lock(&self.writes).clone()
    }

    /// Every accepted selection change, in order.
    pub fn selections(&self) -> Vec<(usize, usize)> {
        lock(&self.selections).clone()
    }
}

impl Default for MockTextField {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFieldAccessor for MockTextField {
    fn read(&self) -> Option<FieldSnapshot> {
        if !self.available.load(Ordering::SeqCst) {
            return None;
        }
        Some(lock(&self.field).clone())
    }

    fn write(&self, text: &str) -> bool {
        if !self.available.load(Ordering::SeqCst) || self.reject_writes.load(Ordering::SeqCst) {
            return false;
        }
        lock(&self.writes).push(text.to_string());
        if !self.lagging.load(Ordering::SeqCst) {
            self.set_text_externally(text);
        }
        true
    }

    fn set_selection(&self, start: usize, end: usize) -> bool {
        if !self.available.load(Ordering::SeqCst) {
            return false;
        }
        lock(&self.selections).push((start, end));
        if !self.lagging.load(Ordering::SeqCst) {
            let mut field = lock(&self.field);
            let len = char_len(&field.text);
            field.selection_start = start.min(len);
            field.selection_end = end.min(len);
        }
        true
    }
}

// ── Clipboard ─────────────────────────────────────────────────────────────────

/// A clipboard held in memory.
#[derive(Default)]
pub struct MockClipboard {
    content: Mutex<Option<String>>,
    labels: Mutex<Vec<String>>,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            content: Mutex::new(Some(text.to_string())),
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        lock(&self.content).clone()
    }

    /// Label of every `set` call, in order.
    pub fn labels(&self) -> Vec<String> {
        lock(&self.labels).clone()
    }
}

impl ClipboardAccessor for MockClipboard {
    fn get(&self) -> Option<String> {
        lock(&self.content).clone()
    }

    fn set(&self, text: &str, label: &str) {
        *lock(&self.content) = Some(text.to_string());
        lock(&self.labels).push(label.to_string());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use touchlink_core::{Point, StrokeSynthesizer};

    #[tokio::test]
    async fn test_executor_records_strokes_and_completes() {
        // Arrange
        let executor = MockStrokeExecutor::new();
        let stroke = StrokeSynthesizer::new()
            .tap(Point::new(1.0, 2.0), 50)
            .unwrap();

        // Act
        let outcome = executor.execute(stroke.clone()).await;

        // Assert
        assert_eq!(outcome, Ok(StrokeOutcome::Completed));
        assert_eq!(executor.strokes(), vec![stroke]);
        assert_eq!(executor.max_outstanding(), 1);
    }

    #[tokio::test]
    async fn test_executor_returns_scripted_outcomes_in_order() {
        let executor = MockStrokeExecutor::new();
        executor.push_outcome(Ok(StrokeOutcome::Cancelled));
        executor.push_outcome(Err(ExecutorError::Unavailable));
        let synth = StrokeSynthesizer::new();

        let first = executor.execute(synth.tap(Point::new(1.0, 1.0), 5).unwrap()).await;
        let second = executor.execute(synth.tap(Point::new(1.0, 1.0), 5).unwrap()).await;
        let third = executor.execute(synth.tap(Point::new(1.0, 1.0), 5).unwrap()).await;

        assert_eq!(first, Ok(StrokeOutcome::Cancelled));
        assert_eq!(second, Err(ExecutorError::Unavailable));
        assert_eq!(third, Ok(StrokeOutcome::Completed));
    }

    #[test]
    fn test_text_field_write_moves_caret_to_end() {
        let field = MockTextField::with_text("ab");

        assert!(field.write("abc"));

        let snap = field.read().unwrap();
        assert_eq!(snap.text, "abc");
        assert_eq!((snap.selection_start, snap.selection_end), (3, 3));
        assert!(field.selections().is_empty());
    }

    #[test]
    fn test_lagging_field_records_but_does_not_apply() {
        let field = MockTextField::with_text("old");
        field.set_lagging(true);

        assert!(field.write("new"));

        assert_eq!(field.text(), "old");
        assert_eq!(field.writes(), vec!["new".to_string()]);
    }

    #[test]
    fn test_unavailable_field_reads_none_and_refuses_writes() {
        let field = MockTextField::new();
        field.set_available(false);

        assert!(field.read().is_none());
        assert!(!field.write("x"));
        assert!(!field.set_selection(0, 0));
    }

    #[test]
    fn test_external_edit_keeps_hint() {
        let field = MockTextField::new();
        field.set_hint("Search");

        field.set_text_externally("Search");

        assert_eq!(field.read().unwrap().effective_text(), "");
    }

    #[test]
    fn test_clipboard_set_then_get() {
        let clipboard = MockClipboard::new();
        assert_eq!(clipboard.get(), None);

        clipboard.set("copied", "touchlink");

        assert_eq!(clipboard.get(), Some("copied".to_string()));
        assert_eq!(clipboard.labels(), vec!["touchlink".to_string()]);
    }
}
