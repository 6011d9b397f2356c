//! touchlink-agent library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the agent do? (for beginners)
//!
//! The *agent* runs on the device being driven.  A remote operator sends it
//! JSON commands (taps, swipes, multi-finger drags, keystrokes) and the agent
//! replays them through the device's input-injection API.
//!
//! That API has two awkward limits the agent hides from the operator:
//!
//! 1. **One gesture at a time.**  Starting a stroke while another is running
//!    cancels the first.  The agent serializes every stroke through one
//!    queue and keeps each finger's drag continuous across interleaving.
//! 2. **Whole-text fields.**  The focused field can only be read and written
//!    as a whole.  The agent records keystrokes as replayable edits, folds a
//!    burst of them (including Vietnamese Telex composition) and writes the
//!    result once.

/// Application layer: gesture engine, text reconciler, command routing.
pub mod application;

/// Infrastructure layer: host adapters, configuration, WebSocket server.
pub mod infrastructure;
