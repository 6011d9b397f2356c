//! Domain logic for remote input injection.
//!
//! Everything here is pure: no async runtime, no host APIs, no sockets.  The
//! agent crate wires these pieces to the outside world.
//!
//! - **`telex`** – Vietnamese Telex composition over an accumulated buffer.
//! - **`text_edit`** – replayable text edits and the fold/cursor math the
//!   text reconciler runs over a burst of keyboard commands.
//! - **`stroke`** – stroke descriptors and their validation rules.
//! - **`sequence`** – monotonic id allocation.

pub mod sequence;
pub mod stroke;
pub mod telex;
pub mod text_edit;
