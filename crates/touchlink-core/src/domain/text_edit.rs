//! Replayable text edits.
//!
//! The remote text field can only be read and written as a whole, and its
//! content may change between our writes (autocorrect, the local user
//! touching the screen).  A keyboard command is therefore not stored as "the
//! new text" but as a [`TextEdit`]: the minimum information needed to replay
//! that one edit against *any* base string.  The reconciler folds a burst of
//! edits over the freshest base it has and writes the result once.
//!
//! All positions are counted in Unicode scalar values (`char`s), not bytes,
//! because that is how the field reports its selection.

use serde::{Deserialize, Serialize};

use super::telex::apply_telex_input;

/// One replayable edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEdit {
    /// Typed input, composed through the Telex rules.  Multi-character input
    /// is appended verbatim.
    Insert(String),
    /// Replace the whole content.
    SetText(String),
    /// Append a literal string (newline, tab, pasted text).
    Append(String),
    /// Remove the last `n` characters, wherever the caret is.
    TruncateEnd(usize),
    /// Remove the characters in `start..end`.
    DeleteRange { start: usize, end: usize },
    /// Replace the characters in `start..end` with `text`.
    ReplaceRange {
        start: usize,
        end: usize,
        text: String,
    },
}

impl TextEdit {
    /// Replays the edit against `base`.
    ///
    /// Returns `None` when the edit does not apply (deleting from an empty
    /// string, a range past the end, empty input).  Callers treat `None` as
    /// "skip this edit".
    pub fn apply(&self, base: &str) -> Option<String> {
        match self {
            TextEdit::Insert(text) if text.is_empty() => None,
            TextEdit::Insert(text) => Some(apply_telex_input(base, text)),
            TextEdit::SetText(text) => Some(text.clone()),
            TextEdit::Append(text) if text.is_empty() => None,
            TextEdit::Append(text) => Some(format!("{base}{text}")),
            TextEdit::TruncateEnd(n) => {
                let len = char_len(base);
                if *n == 0 || len == 0 {
                    return None;
                }
                Some(base.chars().take(len.saturating_sub(*n)).collect())
            }
            TextEdit::DeleteRange { start, end } => splice(base, *start, *end, ""),
            TextEdit::ReplaceRange { start, end, text } => splice(base, *start, *end, text),
        }
    }

    /// Moves a cursor across this edit.
    ///
    /// `before` and `after` are the texts this edit turned into one another;
    /// the insertion case needs them because Telex composition can replace a
    /// character instead of adding one.
    pub fn cursor_after(&self, cursor: usize, before: &str, after: &str) -> usize {
        match self {
            TextEdit::Insert(_) => {
                cursor + char_len(after).saturating_sub(char_len(before))
            }
            TextEdit::SetText(_) => char_len(after),
            TextEdit::Append(text) => cursor + char_len(text),
            TextEdit::TruncateEnd(n) => cursor.saturating_sub(*n),
            TextEdit::DeleteRange { start, .. } => *start,
            TextEdit::ReplaceRange { start, text, .. } => start + char_len(text),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TextEdit::Insert(_) => "insert",
            TextEdit::SetText(_) => "set",
            TextEdit::Append(_) => "append",
            TextEdit::TruncateEnd(_) => "truncate",
            TextEdit::DeleteRange { .. } => "delete-range",
            TextEdit::ReplaceRange { .. } => "replace-range",
        }
    }
}

/// Result of folding a sequence of edits over a base text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldOutcome {
    pub text: String,
    /// Cursor position after every edit, clamped to `[0, len(text)]`.
    pub cursor: usize,
    /// Indices (into the folded slice) of edits that did not apply.
    pub skipped: Vec<usize>,
}

/// Applies `edits` in order starting from `base` and a starting cursor.
///
/// Edits that return `None` from [`TextEdit::apply`] leave both the text and
/// the cursor unchanged and are reported in [`FoldOutcome::skipped`].
pub fn fold_edits<'a, I>(base: &str, start_cursor: usize, edits: I) -> FoldOutcome
where
    I: IntoIterator<Item = &'a TextEdit>,
{
    let mut text = base.to_string();
    let mut cursor = start_cursor;
    let mut skipped = Vec::new();

    for (idx, edit) in edits.into_iter().enumerate() {
        match edit.apply(&text) {
            Some(next) => {
                cursor = edit.cursor_after(cursor, &text, &next);
                text = next;
            }
            None => skipped.push(idx),
        }
    }

    let cursor = cursor.min(char_len(&text));
    FoldOutcome {
        text,
        cursor,
        skipped,
    }
}

/// Number of `char`s in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Returns the characters in `start..end` (clamped to the text).
pub fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

fn splice(base: &str, start: usize, end: usize, insert: &str) -> Option<String> {
    let len = char_len(base);
    let end = end.min(len);
    if start > end || (start == end && insert.is_empty()) {
        return None;
    }
    let mut out: String = base.chars().take(start).collect();
    out.push_str(insert);
    out.extend(base.chars().skip(end));
    Some(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
