//! TextReconciler: turns keyboard commands into whole-text field writes.
//!
//! The host exposes the focused text field only as "read everything" and
//! "write everything".  Writing once per keystroke is slow and races with
//! the field's own updates (autocorrect, the local user).  Instead every
//! keyboard command is recorded as a [`TextEvent`] holding a replayable
//! [`TextEdit`], and a background loop folds all unsent events over the best
//! known base text and writes the result once.
//!
//! # The reconciliation pass (for beginners)
//!
//! ```text
//!   unsent events ──► choose base ──► fold edits ──► same as cached? ── yes ─► skip write
//!                        │                                 │ no
//!                        │                                 ▼
//!                        │                         write text, restore cursor
//!                        │                                 │
//!                        └──────── mark sent, stamp final text, prune ◄─┘
//! ```
//!
//! Choosing the base text:
//!
//! - a single unsent event re-reads the field first, so edits made on the
//!   device itself are not overwritten;
//! - several unsent events build on the text we wrote last, because the
//!   field may not have caught up with our own write yet;
//! - if nothing was written for longer than the sync delay, the field is
//!   read fresh either way.
//!
//! After the queue drains, a debounced re-sync refreshes the cached text
//! from the field so later comparisons see external edits.  Any new command
//! cancels a pending re-sync.
//!
//! # Locking
//!
//! Queue state lives behind a `std::sync::Mutex` that is never held across
//! an `.await` or a host call.  A `processing` flag guarantees only one
//! reconciliation loop runs at a time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use touchlink_core::protocol::{KeyboardAction, KeyboardCommand};
use touchlink_core::{char_len, char_slice, fold_edits, IdSequence, TextEdit};

// ── Host capabilities ─────────────────────────────────────────────────────────

/// What the host reports about the focused field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSnapshot {
    pub text: String,
    /// Placeholder text.  Some hosts report it as the content of an empty
    /// field.
    pub hint: Option<String>,
    pub selection_start: usize,
    pub selection_end: usize,
}

impl FieldSnapshot {
    /// A field containing `text` with the caret at the end.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let end = char_len(&text);
        Self {
            text,
            hint: None,
            selection_start: end,
            selection_end: end,
        }
    }

    /// The content, with a displayed placeholder treated as empty.
    pub fn effective_text(&self) -> &str {
        match &self.hint {
            Some(hint) if !hint.is_empty() && *hint == self.text => "",
            _ => &self.text,
        }
    }

    /// The selected range in ascending order, or `None` for a bare caret.
    pub fn selection(&self) -> Option<(usize, usize)> {
        let start = self.selection_start.min(self.selection_end);
        let end = self.selection_start.max(self.selection_end);
        (start != end).then_some((start, end))
    }
}

/// Host access to the focused editable field.
#[cfg_attr(test, mockall::automock)]
pub trait TextFieldAccessor: Send + Sync {
    /// `None` when no editable field is focused.
    fn read(&self) -> Option<FieldSnapshot>;
    fn write(&self, text: &str) -> bool;
    fn set_selection(&self, start: usize, end: usize) -> bool;
}

/// Host clipboard.
#[cfg_attr(test, mockall::automock)]
pub trait ClipboardAccessor: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, text: &str, label: &str);
}

// ── Configuration and errors ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSyncConfig {
    /// After this long without a write, the field is re-read for the base.
    pub sync_delay: Duration,
    /// Debounce before the idle re-sync.
    pub idle_resync: Duration,
    /// How long sent events are kept.
    pub retention: Duration,
    /// Pause between reconciliation passes while events keep arriving.
    pub batch_yield: Duration,
    /// Label attached to clipboard writes.
    pub clipboard_label: String,
}

impl Default for TextSyncConfig {
    fn default() -> Self {
        Self {
            sync_delay: Duration::from_millis(500),
            idle_resync: Duration::from_millis(1000),
            retention: Duration::from_secs(10),
            batch_yield: Duration::from_millis(5),
            clipboard_label: "touchlink".to_string(),
        }
    }
}

/// Reasons a keyboard command is dropped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TextSyncError {
    #[error("no focused text field")]
    NoField,
    #[error("nothing is selected")]
    NoSelection,
    #[error("clipboard is empty")]
    ClipboardEmpty,
    #[error("keyboard action {0:?} requires text")]
    MissingText(KeyboardAction),
    #[error("text field refused the selection change")]
    SelectionRejected,
}

// ── Events ────────────────────────────────────────────────────────────────────

/// One recorded keyboard command.
#[derive(Debug, Clone)]
pub struct TextEvent {
    pub id: u64,
    pub action: KeyboardAction,
    pub edit: TextEdit,
    pub created_at: Instant,
    pub is_sent: bool,
    /// Text written by the pass that folded this event.
    pub final_text: Option<String>,
    pub sent_at: Option<Instant>,
    /// Selection captured when the command arrived.
    pub selection: Option<(usize, usize)>,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No unsent events.
    Idle,
    Written { text: String, cursor: usize },
    /// The folded text equals the cached text; nothing written.
    Unchanged,
    /// The field was missing or refused the write; the events were dropped.
    Dropped,
}

#[derive(Default)]
struct QueueState {
    events: VecDeque<TextEvent>,
    current_text: String,
    last_sent_at: Option<Instant>,
    processing: bool,
    resync: Option<JoinHandle<()>>,
}

impl QueueState {
    fn has_unsent(&self) -> bool {
        self.events.iter().any(|e| !e.is_sent)
    }

    fn prune(&mut self, now: Instant, retention: Duration) {
        self.events.retain(|e| match e.sent_at {
            Some(sent_at) if e.is_sent => now.duration_since(sent_at) <= retention,
            _ => true,
        });
    }
}

struct Inner {
    state: Mutex<QueueState>,
    field: Arc<dyn TextFieldAccessor>,
    clipboard: Arc<dyn ClipboardAccessor>,
    config: TextSyncConfig,
    ids: IdSequence,
    idle: watch::Sender<bool>,
}

// ── Reconciler ────────────────────────────────────────────────────────────────

/// Cloneable handle to the text reconciliation engine.
#[derive(Clone)]
pub struct TextReconciler {
    inner: Arc<Inner>,
}

impl TextReconciler {
    pub fn new(
        field: Arc<dyn TextFieldAccessor>,
        clipboard: Arc<dyn ClipboardAccessor>,
        config: TextSyncConfig,
    ) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                field,
                clipboard,
                config,
                ids: IdSequence::new(),
                idle,
            }),
        }
    }

    /// Applies one `KEYBOARD` command.
    ///
    /// Text-changing actions are queued and written by the background loop;
    /// clipboard and selection actions take effect immediately.  Must be
    /// called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`TextSyncError`] when the command cannot apply (no field, nothing
    /// selected, empty clipboard).  Nothing is queued in that case.
    pub fn handle_keyboard(&self, command: &KeyboardCommand) -> Result<(), TextSyncError> {
        let action = command.action;
        match action {
            KeyboardAction::InsertText => {
                let text = command
                    .payload()
                    .filter(|t| !t.is_empty())
                    .ok_or(TextSyncError::MissingText(action))?;
                self.submit(action, TextEdit::Insert(text.to_string()), None);
            }
            KeyboardAction::SetText => {
                let text = command.payload().ok_or(TextSyncError::MissingText(action))?;
                self.submit(action, TextEdit::SetText(text.to_string()), None);
            }
            KeyboardAction::Enter => self.submit(action, TextEdit::Append("\n".into()), None),
            KeyboardAction::Tab => self.submit(action, TextEdit::Append("\t".into()), None),
            KeyboardAction::Backspace | KeyboardAction::Delete => {
                let selection = self.read_field()?.selection();
                let edit = match selection {
                    Some((start, end)) => TextEdit::DeleteRange { start, end },
                    None => TextEdit::TruncateEnd(command.repeat_count()),
                };
                self.submit(action, edit, selection);
            }
            KeyboardAction::Copy => {
                self.copy_selection()?;
            }
            KeyboardAction::Cut => {
                let (start, end) = self.copy_selection()?;
                self.submit(action, TextEdit::DeleteRange { start, end }, Some((start, end)));
            }
            KeyboardAction::Paste => {
                let text = self
                    .inner
                    .clipboard
                    .get()
                    .filter(|t| !t.is_empty())
                    .ok_or(TextSyncError::ClipboardEmpty)?;
                let selection = self.inner.field.read().and_then(|f| f.selection());
                let edit = match selection {
                    Some((start, end)) => TextEdit::ReplaceRange { start, end, text },
                    None => TextEdit::Append(text),
                };
                self.submit(action, edit, selection);
            }
            KeyboardAction::SelectAll => {
                let field = self.read_field()?;
                let len = char_len(field.effective_text());
                if !self.inner.field.set_selection(0, len) {
                    return Err(TextSyncError::SelectionRejected);
                }
            }
        }
        Ok(())
    }

    /// Resolves once no reconciliation loop is running.
    pub async fn wait_idle(&self) {
        let mut idle = self.inner.idle.subscribe();
        let _ = idle.wait_for(|idle| *idle).await;
    }

    /// The text the reconciler believes the field holds.
    pub fn current_text(&self) -> String {
        self.inner.lock().current_text.clone()
    }

    /// Events not yet folded into a write.
    pub fn pending_events(&self) -> usize {
        self.inner.lock().events.iter().filter(|e| !e.is_sent).count()
    }

    /// Sent and unsent events still held.
    pub fn retained_events(&self) -> usize {
        self.inner.lock().events.len()
    }

    /// Drops every event and cancels the pending re-sync.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        if let Some(resync) = state.resync.take() {
            resync.abort();
        }
        let dropped = state.events.len();
        state.events.clear();
        if dropped > 0 {
            info!("cleared {dropped} text event(s)");
        }
    }

    fn read_field(&self) -> Result<FieldSnapshot, TextSyncError> {
        self.inner.field.read().ok_or(TextSyncError::NoField)
    }

    fn copy_selection(&self) -> Result<(usize, usize), TextSyncError> {
        let field = self.read_field()?;
        let (start, end) = field.selection().ok_or(TextSyncError::NoSelection)?;
        let text = char_slice(field.effective_text(), start, end);
        self.inner
            .clipboard
            .set(&text, &self.inner.config.clipboard_label);
        debug!("copied {} character(s) to the clipboard", end - start);
        Ok((start, end))
    }

    fn submit(&self, action: KeyboardAction, edit: TextEdit, selection: Option<(usize, usize)>) {
        let event = TextEvent {
            id: self.inner.ids.next_id(),
            action,
            edit,
            created_at: Instant::now(),
            is_sent: false,
            final_text: None,
            sent_at: None,
            selection,
        };
        debug!("queued text event {} ({})", event.id, event.edit.kind());

        let mut state = self.inner.lock();
        state.events.push_back(event);
        if let Some(resync) = state.resync.take() {
            resync.abort();
        }
        if !state.processing {
            state.processing = true;
            self.inner.idle.send_replace(false);
            tokio::spawn(Arc::clone(&self.inner).run());
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(self: Arc<Self>) {
        loop {
            self.reconcile_batch();
            {
                let mut state = self.lock();
                if !state.has_unsent() {
                    state.processing = false;
                    state.resync = Some(self.schedule_resync());
                    self.idle.send_replace(true);
                    return;
                }
            }
            tokio::time::sleep(self.config.batch_yield).await;
        }
    }

    /// Folds every unsent event and writes the result.
    fn reconcile_batch(&self) -> ReconcileOutcome {
        let now = Instant::now();
        let (ids, edits, last_final, cached, last_sent_at) = {
            let state = self.lock();
            let unsent: Vec<&TextEvent> = state.events.iter().filter(|e| !e.is_sent).collect();
            if unsent.is_empty() {
                return ReconcileOutcome::Idle;
            }
            let ids: Vec<u64> = unsent.iter().map(|e| e.id).collect();
            let edits: Vec<TextEdit> = unsent.iter().map(|e| e.edit.clone()).collect();
            let last_final = state
                .events
                .iter()
                .rev()
                .find(|e| e.is_sent)
                .and_then(|e| e.final_text.clone());
            (ids, edits, last_final, state.current_text.clone(), state.last_sent_at)
        };

        let Some(field) = self.field.read() else {
            warn!("no focused text field; dropping {} keyboard event(s)", ids.len());
            self.drop_events(&ids);
            return ReconcileOutcome::Dropped;
        };
        let field_text = field.effective_text().to_string();

        let stale = last_sent_at.map_or(true, |t| now.duration_since(t) >= self.config.sync_delay);
        // Compare against what the field holds whenever the base was read from it.
        let current_text = if ids.len() == 1 || stale {
            field_text.clone()
        } else {
            cached
        };
        let base = if stale {
            field_text
        } else if ids.len() > 1 {
            last_final.unwrap_or_else(|| current_text.clone())
        } else {
            current_text.clone()
        };

        let start_cursor = field.selection_start.min(char_len(&base));
        let outcome = fold_edits(&base, start_cursor, &edits);
        for idx in &outcome.skipped {
            info!(
                "text event {} ({}) did not apply; skipped",
                ids[*idx],
                edits[*idx].kind()
            );
        }

        let result = if outcome.text == current_text {
            debug!("text unchanged after {} event(s); write skipped", ids.len());
            ReconcileOutcome::Unchanged
        } else {
            if !self.field.write(&outcome.text) {
                warn!("text field refused the write; dropping {} event(s)", ids.len());
                self.drop_events(&ids);
                return ReconcileOutcome::Dropped;
            }
            if !self.field.set_selection(outcome.cursor, outcome.cursor) {
                debug!("could not restore cursor to {}", outcome.cursor);
            }
            debug!("wrote {} character(s) for {} event(s)", char_len(&outcome.text), ids.len());
            ReconcileOutcome::Written {
                text: outcome.text.clone(),
                cursor: outcome.cursor,
            }
        };

        let mut state = self.lock();
        for event in state.events.iter_mut().filter(|e| ids.contains(&e.id)) {
            event.is_sent = true;
            event.final_text = Some(outcome.text.clone());
            event.sent_at = Some(now);
        }
        state.current_text = outcome.text;
        state.last_sent_at = Some(now);
        state.prune(now, self.config.retention);
        result
    }

    fn drop_events(&self, ids: &[u64]) {
        self.lock().events.retain(|e| !ids.contains(&e.id));
    }

    fn schedule_resync(self: &Arc<Self>) -> JoinHandle<()> {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.idle_resync).await;
            inner.resync_from_field();
        })
    }

    /// Refreshes the cached text from the field while the queue is idle.
    fn resync_from_field(&self) {
        let Some(field) = self.field.read() else {
            debug!("idle re-sync skipped: no focused field");
            return;
        };
        let mut state = self.lock();
        if state.processing || state.has_unsent() {
            return;
        }
        let text = field.effective_text();
        if state.current_text != text {
            debug!("field changed while idle; cached text refreshed");
            state.current_text = text.to_string();
        }
        state.prune(Instant::now(), self.config.retention);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
