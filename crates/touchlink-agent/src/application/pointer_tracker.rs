//! PointerTracker: per-finger state machine feeding the dispatch queue.
//!
//! A remote operator drags with one or more fingers.  Each finger arrives
//! as a stream of `DOWN`, `MOVE`..., `UP` (or `CANCEL`) commands carrying the
//! same pointer id.  The host can only continue a stroke from the descriptor
//! of the segment that preceded it, and only once that segment has finished,
//! so every pointer keeps:
//!
//! - the last descriptor the host executed (`current_stroke`),
//! - the position the finger is resting at (`last`),
//! - a FIFO of movements that arrived while a segment was executing.
//!
//! At most one segment per pointer sits in the global [`GestureDispatchQueue`]
//! at any time.  When it completes, the next queued movement for that pointer
//! is turned into a continuation and submitted.  Two fingers therefore
//! interleave in the global queue while each finger's own stroke stays
//! continuous.
//!
//! # Lifecycle
//!
//! ```text
//! DOWN ──► initial zero-length segment (will_continue)
//! MOVE ──► segment (will_continue)          ┐ queued per pointer,
//! UP   ──► segment (ends), pending_dispose  ┘ one in flight at a time
//! last segment completes ──► pointer removed
//! ```
//!
//! All methods take `&mut self`; the tracker is owned by the gesture engine
//! actor, so no locking is needed.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use touchlink_core::{
    Point, PointerId, StrokeDescriptor, StrokeId, StrokePath, StrokeSynthesizer,
};

use super::gesture_queue::{
    DispatchCompletion, GestureDispatchQueue, GestureTask, StrokeExecutor,
};

/// Shortest segment duration the host accepts reliably.
pub const MIN_SEGMENT_DURATION_MS: u64 = 8;

/// One movement waiting to be turned into a stroke continuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSegment {
    /// `None` lifts the finger wherever it is when the segment is dispatched.
    pub to: Option<Point>,
    pub duration_ms: u64,
    pub will_continue: bool,
}

/// State of one active pointer.
#[derive(Debug)]
pub struct PointerState {
    pub pointer_id: PointerId,
    pub pointer_type: String,
    /// Last descriptor the host finished.  `None` until touch-down completes.
    pub current_stroke: Option<StrokeDescriptor>,
    pub last: Point,
    pub segments: VecDeque<PointerSegment>,
    /// Descriptor submitted to the queue and not yet reported back.
    pub in_flight: Option<StrokeDescriptor>,
    /// Set once the final (lifting) segment has been accepted.
    pub pending_dispose: bool,
}

impl PointerState {
    fn new(pointer_id: PointerId, pointer_type: &str, at: Point) -> Self {
        Self {
            pointer_id,
            pointer_type: pointer_type.to_string(),
            current_stroke: None,
            last: at,
            segments: VecDeque::new(),
            in_flight: None,
            pending_dispose: false,
        }
    }

    pub fn is_dispatching(&self) -> bool {
        self.in_flight.is_some()
    }

    fn stroke_ended(&self) -> bool {
        self.current_stroke
            .as_ref()
            .is_some_and(|s| !s.will_continue)
    }
}

/// Result of one pointer segment, produced by the task callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentResult {
    pub pointer_id: PointerId,
    pub stroke_id: StrokeId,
    pub segment: u32,
    pub completed: bool,
}

/// Diagnostic view of the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackerSnapshot {
    /// Active pointer ids, ascending.
    pub active_pointers: Vec<PointerId>,
    /// Tasks waiting behind the executing one.
    pub queued_tasks: usize,
    pub busy: bool,
}

/// Owns every [`PointerState`] and the global dispatch queue.
pub struct PointerTracker {
    pointers: HashMap<PointerId, PointerState>,
    queue: GestureDispatchQueue,
    synthesizer: StrokeSynthesizer,
    results_tx: mpsc::UnboundedSender<SegmentResult>,
    results_rx: mpsc::UnboundedReceiver<SegmentResult>,
    min_segment_duration_ms: u64,
}

impl PointerTracker {
    pub fn new(
        executor: Arc<dyn StrokeExecutor>,
        completions: mpsc::UnboundedSender<DispatchCompletion>,
        min_segment_duration_ms: u64,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            pointers: HashMap::new(),
            queue: GestureDispatchQueue::new(executor, completions),
            synthesizer: StrokeSynthesizer::new(),
            results_tx,
            results_rx,
            min_segment_duration_ms: min_segment_duration_ms.max(1),
        }
    }

    /// Handles `DOWN`: creates the pointer and submits its touch-down segment.
    pub fn start_pointer(
        &mut self,
        pointer_id: PointerId,
        at: Point,
        pointer_type: &str,
        duration_ms: u64,
    ) {
        if self.pointers.contains_key(&pointer_id) {
            warn!("DOWN for already active pointer {pointer_id} ignored");
            return;
        }
        let duration_ms = duration_ms.max(self.min_segment_duration_ms);
        let stroke = match self.synthesizer.begin(at, duration_ms, true, pointer_type) {
            Ok(stroke) => stroke,
            Err(e) => {
                warn!("DOWN for pointer {pointer_id} dropped: {e}");
                return;
            }
        };

        info!("pointer {pointer_id} ({pointer_type}) down at ({}, {})", at.x, at.y);
        self.pointers
            .insert(pointer_id, PointerState::new(pointer_id, pointer_type, at));
        self.submit(pointer_id, stroke);
    }

    /// Handles `MOVE` (`will_continue = true`) and `UP` (`false`).
    pub fn move_pointer(
        &mut self,
        pointer_id: PointerId,
        to: Point,
        duration_ms: u64,
        will_continue: bool,
    ) {
        let Some(state) = self.pointers.get_mut(&pointer_id) else {
            warn!("movement for unknown pointer {pointer_id} ignored");
            return;
        };
        if state.pending_dispose && will_continue {
            debug!("MOVE after UP for pointer {pointer_id} dropped");
            return;
        }

        state.segments.push_back(PointerSegment {
            to: Some(to),
            duration_ms,
            will_continue,
        });
        if !will_continue {
            state.pending_dispose = true;
        }
        self.flush(pointer_id);
    }

    /// Handles `CANCEL`: discards queued movement and lifts the finger where
    /// it is.  If a segment is executing, the lift waits for it.
    pub fn cancel_pointer(&mut self, pointer_id: PointerId) {
        let Some(state) = self.pointers.get_mut(&pointer_id) else {
            warn!("CANCEL for unknown pointer {pointer_id} ignored");
            return;
        };

        let purged = self.queue.purge_tasks(pointer_id);
        if purged > 0 {
            // The in-flight descriptor was still queued; it will never report.
            state.in_flight = None;
        }
        state.segments.clear();

        if state.current_stroke.is_none() && state.in_flight.is_none() {
            info!("pointer {pointer_id} cancelled before touch-down");
            self.pointers.remove(&pointer_id);
            return;
        }

        state.segments.push_back(PointerSegment {
            to: None,
            duration_ms: 0,
            will_continue: false,
        });
        state.pending_dispose = true;
        info!("pointer {pointer_id} cancelled");
        self.flush(pointer_id);
    }

    /// Feeds an executor completion back into the queue and applies the
    /// per-pointer result it produced.
    pub fn on_dispatch_completion(&mut self, completion: DispatchCompletion) {
        self.queue.complete(completion);
        while let Ok(result) = self.results_rx.try_recv() {
            self.on_segment_result(result);
        }
    }

    /// Forgets every pointer and queued task.
    pub fn clear(&mut self) {
        let active = self.pointers.len();
        self.pointers.clear();
        self.queue.clear();
        while self.results_rx.try_recv().is_ok() {}
        if active > 0 {
            info!("cleared {active} active pointer(s)");
        }
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let mut active_pointers: Vec<PointerId> = self.pointers.keys().copied().collect();
        active_pointers.sort_unstable();
        TrackerSnapshot {
            active_pointers,
            queued_tasks: self.queue.len(),
            busy: self.queue.is_busy(),
        }
    }

    pub fn pointer(&self, pointer_id: PointerId) -> Option<&PointerState> {
        self.pointers.get(&pointer_id)
    }

    fn on_segment_result(&mut self, result: SegmentResult) {
        let pointer_id = result.pointer_id;
        let Some(state) = self.pointers.get_mut(&pointer_id) else {
            debug!("result for removed pointer {pointer_id}");
            self.queue.purge_tasks(pointer_id);
            return;
        };
        let matches = state
            .in_flight
            .as_ref()
            .is_some_and(|s| s.stroke_id == result.stroke_id && s.segment == result.segment);
        if !matches {
            debug!(
                "stale result for pointer {pointer_id} ({} segment {})",
                result.stroke_id, result.segment
            );
            return;
        }
        let Some(stroke) = state.in_flight.take() else {
            return;
        };

        if !result.completed {
            warn!(
                "{} of pointer {pointer_id} did not complete; dropping pointer",
                stroke.stroke_id
            );
            self.drop_pointer(pointer_id);
            return;
        }

        state.last = stroke.end_point();
        state.current_stroke = Some(stroke);
        self.flush(pointer_id);
    }

    /// Submits the pointer's next segment if nothing of it is in flight.
    fn flush(&mut self, pointer_id: PointerId) {
        let Some(state) = self.pointers.get_mut(&pointer_id) else {
            return;
        };
        if state.is_dispatching() {
            return;
        }

        if state.stroke_ended() {
            if !state.segments.is_empty() {
                debug!(
                    "discarding {} segment(s) queued after pointer {pointer_id} lifted",
                    state.segments.len()
                );
            }
            debug!("pointer {pointer_id} up");
            self.drop_pointer(pointer_id);
            return;
        }

        let Some(segment) = state.segments.pop_front() else {
            if state.pending_dispose {
                self.drop_pointer(pointer_id);
            }
            return;
        };
        let Some(previous) = state.current_stroke.as_ref() else {
            warn!("pointer {pointer_id} has no stroke to continue; dropping");
            self.drop_pointer(pointer_id);
            return;
        };

        let path = StrokePath::line(state.last, segment.to.unwrap_or(state.last));
        let duration_ms = segment.duration_ms.max(self.min_segment_duration_ms);
        let stroke = match self.synthesizer.continue_stroke(
            previous,
            path,
            duration_ms,
            segment.will_continue,
        ) {
            Ok(stroke) => stroke,
            Err(e) => {
                // The host still holds the finger down; end the stroke in place.
                warn!("pointer {pointer_id}: {e}; lifting at ({}, {})", state.last.x, state.last.y);
                let lift = self.synthesizer.continue_stroke(
                    previous,
                    StrokePath::at(state.last),
                    self.min_segment_duration_ms,
                    false,
                );
                match lift {
                    Ok(lift) => {
                        state.segments.clear();
                        state.pending_dispose = true;
                        lift
                    }
                    Err(e) => {
                        warn!("pointer {pointer_id} dropped: {e}");
                        self.drop_pointer(pointer_id);
                        return;
                    }
                }
            }
        };
        self.submit(pointer_id, stroke);
    }

    fn submit(&mut self, pointer_id: PointerId, stroke: StrokeDescriptor) {
        if let Some(state) = self.pointers.get_mut(&pointer_id) {
            state.in_flight = Some(stroke.clone());
        }
        let results = self.results_tx.clone();
        let (stroke_id, segment) = (stroke.stroke_id, stroke.segment);
        let task = GestureTask::new(pointer_id, stroke, move |completed| {
            let _ = results.send(SegmentResult {
                pointer_id,
                stroke_id,
                segment,
                completed,
            });
        });
        self.queue.enqueue(task);
    }

    fn drop_pointer(&mut self, pointer_id: PointerId) {
        self.pointers.remove(&pointer_id);
        self.queue.purge_tasks(pointer_id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
