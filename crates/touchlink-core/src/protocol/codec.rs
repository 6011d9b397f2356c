//! JSON codec for command frames.
//!
//! Decoding is two steps: serde parses the frame into a [`Command`], then
//! [`validate`] rejects values serde cannot express constraints for
//! (non-finite coordinates, empty payloads where one is required).  Keeping
//! the checks here means the agent's application layer only ever sees
//! well-formed commands.

use thiserror::Error;

use super::commands::{Command, KeyboardAction, PointerCommand, Reply};

/// Errors produced while decoding or encoding a command frame.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The frame is not valid JSON or does not match any command shape.
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A coordinate is NaN or infinite.
    #[error("{command} has a non-finite coordinate")]
    NonFiniteCoordinate { command: &'static str },

    /// A coordinate lies left of or above the screen origin.
    #[error("{command} has a negative coordinate")]
    NegativeCoordinate { command: &'static str },

    /// A keyboard action that needs text arrived without any.
    #[error("keyboard action {0:?} requires text")]
    MissingText(KeyboardAction),
}

/// Decodes and validates one command frame.
///
/// # Errors
///
/// [`CommandError::Malformed`] for JSON/shape errors, or a validation error.
///
/// # Examples
///
/// ```rust
/// use touchlink_core::protocol::{decode_command, Command};
///
/// let cmd = decode_command(r#"{"type":"TAP","x":10,"y":20}"#).unwrap();
/// assert!(matches!(cmd, Command::Tap(_)));
/// ```
pub fn decode_command(frame: &str) -> Result<Command, CommandError> {
    let command: Command = serde_json::from_str(frame)?;
    validate(&command)?;
    Ok(command)
}

/// Encodes a command as a JSON frame.
///
/// # Errors
///
/// [`CommandError::Malformed`] if serde_json rejects the value.
pub fn encode_command(command: &Command) -> Result<String, CommandError> {
    Ok(serde_json::to_string(command)?)
}

/// Encodes a reply frame.
///
/// # Errors
///
/// See [`encode_command`].
pub fn encode_reply(reply: &Reply) -> Result<String, CommandError> {
    Ok(serde_json::to_string(reply)?)
}

/// Checks the constraints serde cannot enforce.
///
/// # Errors
///
/// [`CommandError::NonFiniteCoordinate`], [`CommandError::NegativeCoordinate`]
/// or [`CommandError::MissingText`].
pub fn validate(command: &Command) -> Result<(), CommandError> {
    match command {
        Command::Pointer(PointerCommand { x, y, .. }) => check_coordinates("POINTER", &[*x, *y]),
        Command::Tap(tap) => check_coordinates("TAP", &[tap.x, tap.y]),
        Command::Swipe(s) => check_coordinates("SWIPE", &[s.x, s.y, s.x2, s.y2]),
        Command::Keyboard(kb) => match kb.action {
            KeyboardAction::InsertText if kb.payload().map_or(true, str::is_empty) => {
                Err(CommandError::MissingText(kb.action))
            }
            // An empty SET_TEXT clears the field, but the field must be present.
            KeyboardAction::SetText if kb.payload().is_none() => {
                Err(CommandError::MissingText(kb.action))
            }
            _ => Ok(()),
        },
    }
}

fn check_coordinates(command: &'static str, values: &[f32]) -> Result<(), CommandError> {
    if !values.iter().all(|v| v.is_finite()) {
        return Err(CommandError::NonFiniteCoordinate { command });
    }
    if values.iter().any(|v| *v < 0.0) {
        return Err(CommandError::NegativeCoordinate { command });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
