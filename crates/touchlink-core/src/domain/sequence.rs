//! Lock-free id allocation for strokes and text events.
//!
//! Both the stroke synthesizer and the text reconciler need identifiers that
//! are unique for the lifetime of the process and increase in submission
//! order.  The text reconciler relies on that ordering to fold events in the
//! order they were typed; the stroke synthesizer uses it to tell strokes
//! apart in logs and in the host executor.
//!
//! # Thread safety
//!
//! The counter is an `AtomicU64`.  `fetch_add` reads and increments in one
//! indivisible step, so concurrent callers never receive the same id.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id source.  Ids start at 1; 0 is never handed out so it can be
/// used as a "no id" sentinel in logs.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    /// Creates a sequence whose first id is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh id.
    ///
    /// `Relaxed` ordering is enough: the ids only need to be unique and
    /// monotonic, they do not publish any other memory.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}
