//! # touchlink-core
//!
//! Shared library for Touchlink containing the command protocol, the Telex
//! composition engine, stroke descriptors and replayable text edits.
//!
//! It has no dependency on an async runtime, host input APIs, or network
//! sockets, so every rule in here can be unit-tested in isolation.
//!
//! # Architecture overview
//!
//! Touchlink lets a remote operator drive a touch device: taps, multi-finger
//! drags and text entry arrive as JSON commands and are replayed through the
//! device's input-injection API.  That API has two hard limits:
//!
//! - only **one gesture** may be in flight system-wide, and
//! - the focused text field can only be read and written **as a whole**.
//!
//! This crate holds the parts of the solution that do not depend on either
//! limit being enforced at runtime:
//!
//! - **`protocol`** – the JSON command frames and their codec.
//! - **`domain`** – Telex composition, stroke synthesis, text edit folding.
//!
//! The `touchlink-agent` crate builds the serialized gesture engine and the
//! text reconciler on top of these.

pub mod domain;
pub mod protocol;

pub use domain::sequence::IdSequence;
pub use domain::stroke::{
    Point, StrokeDescriptor, StrokeError, StrokeId, StrokePath, StrokeSynthesizer,
};
pub use domain::telex::apply_telex_input;
pub use domain::text_edit::{char_len, char_slice, fold_edits, FoldOutcome, TextEdit};
pub use protocol::codec::{decode_command, encode_command, CommandError};
pub use protocol::commands::{Command, PointerId};
