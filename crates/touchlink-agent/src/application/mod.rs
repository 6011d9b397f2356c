//! Application layer use cases for the agent.
//!
//! # What use cases does the agent have?
//!
//! - **`gesture_queue`** – The global single-flight FIFO in front of the
//!   host [`gesture_queue::StrokeExecutor`].  Only one stroke may be in
//!   flight system-wide; everything else waits here.
//!
//! - **`pointer_tracker`** – Per-finger state machine.  Turns `DOWN` /
//!   `MOVE` / `UP` / `CANCEL` streams into a chain of stroke continuations,
//!   one segment in flight per pointer.
//!
//! - **`gesture_engine`** – Actor task owning the tracker and the queue, and
//!   the cloneable handle used to talk to it.
//!
//! - **`text_sync`** – Batches keyboard commands into replayable edits and
//!   writes the folded result to the focused field in as few writes as
//!   possible.
//!
//! - **`route_command`** – Dispatches decoded commands to the right engine.
//!
//! Host capabilities (stroke executor, text field, clipboard) are traits
//! defined here and implemented in the infrastructure layer.

pub mod gesture_engine;
pub mod gesture_queue;
pub mod pointer_tracker;
pub mod route_command;
pub mod text_sync;
