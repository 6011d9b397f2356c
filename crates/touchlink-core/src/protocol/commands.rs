//! Inbound command types.
//!
//! Commands arrive as JSON objects with a `"type"` discriminant.  All other
//! fields use camelCase names:
//!
//! ```json
//! {"type":"POINTER","action":"DOWN","pointerId":1,"pointerType":"touch","x":10,"y":10,"durationMs":8}
//! {"type":"TAP","x":540,"y":1200,"durationMs":50}
//! {"type":"SWIPE","x":540,"y":1600,"x2":540,"y2":400,"durationMs":300}
//! {"type":"KEYBOARD","action":"INSERT_TEXT","text":"a"}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` handles the discriminant; fields that are
//! optional on the wire carry `#[serde(default)]`.

use serde::{Deserialize, Serialize};

use crate::domain::stroke::DEFAULT_POINTER_TYPE;

/// Caller-supplied identity of a logical pointer (finger, mouse, wheel).
pub type PointerId = i32;

/// Every command the agent accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Pointer(PointerCommand),
    Tap(TapCommand),
    Swipe(SwipeCommand),
    Keyboard(KeyboardCommand),
}

impl Command {
    /// The wire name of the command type, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::Pointer(_) => "POINTER",
            Command::Tap(_) => "TAP",
            Command::Swipe(_) => "SWIPE",
            Command::Keyboard(_) => "KEYBOARD",
        }
    }
}

/// Phase of a multi-touch pointer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PointerAction {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerCommand {
    pub action: PointerAction,
    pub pointer_id: PointerId,
    #[serde(default = "default_pointer_type")]
    pub pointer_type: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// Duration of the movement; 0 lets the agent pick its minimum.
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapCommand {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeCommand {
    pub x: f32,
    pub y: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Keyboard-style edits against the focused text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyboardAction {
    InsertText,
    SetText,
    Backspace,
    Delete,
    Enter,
    Tab,
    Copy,
    Paste,
    Cut,
    SelectAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyboardCommand {
    pub action: KeyboardAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Single typed key; used by `INSERT_TEXT` when `text` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Repeat count for `BACKSPACE` / `DELETE`; defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl KeyboardCommand {
    pub fn new(action: KeyboardAction) -> Self {
        Self {
            action,
            text: None,
            key: None,
            count: None,
        }
    }

    pub fn with_text(action: KeyboardAction, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new(action)
        }
    }

    /// The text payload: `text` if present, otherwise `key`.
    pub fn payload(&self) -> Option<&str> {
        self.text.as_deref().or(self.key.as_deref())
    }

    pub fn repeat_count(&self) -> usize {
        self.count.unwrap_or(1).max(1) as usize
    }
}

/// Frames the agent sends back over the command channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    /// A frame could not be decoded or routed.
    Error { message: String },
}

fn default_pointer_type() -> String {
    DEFAULT_POINTER_TYPE.to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_command_deserializes_camel_case_fields() {
        // Arrange
        let json = r#"{"type":"POINTER","action":"MOVE","pointerId":3,"pointerType":"mouse","x":1.5,"y":2,"durationMs":16}"#;

        // Act
        let cmd: Command = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(
            cmd,
            Command::Pointer(PointerCommand {
                action: PointerAction::Move,
                pointer_id: 3,
                pointer_type: "mouse".to_string(),
                x: 1.5,
                y: 2.0,
                duration_ms: 16,
            })
        );
    }

    #[test]
    fn test_pointer_type_defaults_to_touch() {
        let json = r#"{"type":"POINTER","action":"CANCEL","pointerId":1}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        match cmd {
            Command::Pointer(p) => {
                assert_eq!(p.pointer_type, "touch");
                assert_eq!(p.duration_ms, 0);
            }
            other => panic!("expected pointer command, got {other:?}"),
        }
    }

    #[test]
    fn test_keyboard_action_uses_screaming_snake_case() {
        let json = r#"{"type":"KEYBOARD","action":"SELECT_ALL"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::Keyboard(KeyboardCommand::new(KeyboardAction::SelectAll))
        );
    }

    #[test]
    fn test_keyboard_payload_prefers_text_over_key() {
        let mut cmd = KeyboardCommand::with_text(KeyboardAction::InsertText, "ab");
        cmd.key = Some("c".to_string());
        assert_eq!(cmd.payload(), Some("ab"));

        cmd.text = None;
        assert_eq!(cmd.payload(), Some("c"));
    }

    #[test]
    fn test_repeat_count_is_at_least_one() {
        let mut cmd = KeyboardCommand::new(KeyboardAction::Backspace);
        assert_eq!(cmd.repeat_count(), 1);
        cmd.count = Some(0);
        assert_eq!(cmd.repeat_count(), 1);
        cmd.count = Some(4);
        assert_eq!(cmd.repeat_count(), 4);
    }

    #[test]
    fn test_swipe_requires_second_point() {
        let json = r#"{"type":"SWIPE","x":1,"y":2}"#;
        assert!(serde_json::from_str::<Command>(json).is_err());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"type":"SCREENSHOT"}"#;
        assert!(serde_json::from_str::<Command>(json).is_err());
    }

    #[test]
    fn test_error_reply_serializes_with_type_tag() {
        let reply = Reply::Error {
            message: "bad frame".to_string(),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"type":"ERROR","message":"bad frame"}"#);
    }
}
