//! Stroke synthesis: building the path descriptors handed to the host.
//!
//! The host gesture API thinks in *strokes*: one finger touching down,
//! travelling along a path for some duration, and either lifting up or
//! staying down so the stroke can be *continued* by a later descriptor.
//! A long drag is therefore a chain of descriptors sharing one
//! [`StrokeId`], each continuing from where the previous one ended:
//!
//! ```text
//! segment 0: (10,10) → (10,10)  will_continue   ← touch down
//! segment 1: (10,10) → (20,20)  will_continue   ← move
//! segment 2: (20,20) → (30,30)  ends            ← lift
//! ```
//!
//! The synthesizer only builds and validates descriptors.  It keeps no
//! per-pointer state apart from the id counter; the pointer state machine
//! decides which descriptor to build next.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sequence::IdSequence;

/// Pointer type used for one-shot taps and swipes.
pub const DEFAULT_POINTER_TYPE: &str = "touch";

/// Identity shared by a stroke and all of its continuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeId(pub u64);

impl std::fmt::Display for StrokeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stroke-{}", self.0)
    }
}

/// A position in the device's logical screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A straight line from `from` to `to`.  A zero-length path is a press in
/// place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePath {
    pub from: Point,
    pub to: Point,
}

impl StrokePath {
    pub fn line(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    pub fn at(point: Point) -> Self {
        Self {
            from: point,
            to: point,
        }
    }

    pub fn is_zero_length(&self) -> bool {
        self.from == self.to
    }
}

/// One stroke segment as submitted to the host executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeDescriptor {
    pub stroke_id: StrokeId,
    /// 0 for the touch-down segment, incremented by every continuation.
    pub segment: u32,
    pub path: StrokePath,
    pub duration_ms: u64,
    /// `true` keeps the finger down after this segment so it can be continued.
    pub will_continue: bool,
    /// Opaque pointer classification (`touch`, `mouse`, ...).
    pub pointer_type: String,
}

impl StrokeDescriptor {
    /// Where the finger is when this segment finishes.
    pub fn end_point(&self) -> Point {
        self.path.to
    }
}

/// Reasons a stroke descriptor cannot be built.
#[derive(Debug, Error, PartialEq)]
pub enum StrokeError {
    #[error("coordinate ({x}, {y}) is not a finite, non-negative position")]
    InvalidCoordinate { x: f32, y: f32 },
    #[error("stroke duration must be positive")]
    ZeroDuration,
    #[error("{0} has already ended and cannot be continued")]
    StrokeEnded(StrokeId),
    #[error("continuation of {stroke_id} starts at ({x}, {y}) instead of the previous end point")]
    Discontinuous { stroke_id: StrokeId, x: f32, y: f32 },
}

/// Builds stroke descriptors and hands out stroke ids.
#[derive(Debug, Default)]
pub struct StrokeSynthesizer {
    ids: IdSequence,
}

impl StrokeSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new stroke with a zero-length press at `at`.
    ///
    /// # Errors
    ///
    /// [`StrokeError::InvalidCoordinate`] or [`StrokeError::ZeroDuration`].
    pub fn begin(
        &self,
        at: Point,
        duration_ms: u64,
        will_continue: bool,
        pointer_type: &str,
    ) -> Result<StrokeDescriptor, StrokeError> {
        self.new_stroke(StrokePath::at(at), duration_ms, will_continue, pointer_type)
    }

    /// A complete tap: press and release in place.
    pub fn tap(&self, at: Point, duration_ms: u64) -> Result<StrokeDescriptor, StrokeError> {
        self.begin(at, duration_ms, false, DEFAULT_POINTER_TYPE)
    }

    /// A complete swipe: press at `from`, travel to `to`, release.
    pub fn swipe(
        &self,
        from: Point,
        to: Point,
        duration_ms: u64,
    ) -> Result<StrokeDescriptor, StrokeError> {
        self.new_stroke(
            StrokePath::line(from, to),
            duration_ms,
            false,
            DEFAULT_POINTER_TYPE,
        )
    }

    /// Builds the next segment of `previous`'s stroke.
    ///
    /// # Errors
    ///
    /// - [`StrokeError::StrokeEnded`] if `previous` lifted the finger.
    /// - [`StrokeError::Discontinuous`] if `path` does not start where
    ///   `previous` ended.
    /// - [`StrokeError::InvalidCoordinate`] / [`StrokeError::ZeroDuration`].
    pub fn continue_stroke(
        &self,
        previous: &StrokeDescriptor,
        path: StrokePath,
        duration_ms: u64,
        will_continue: bool,
    ) -> Result<StrokeDescriptor, StrokeError> {
        if !previous.will_continue {
            return Err(StrokeError::StrokeEnded(previous.stroke_id));
        }
        if path.from != previous.end_point() {
            return Err(StrokeError::Discontinuous {
                stroke_id: previous.stroke_id,
                x: path.from.x,
                y: path.from.y,
            });
        }
        validate(&path, duration_ms)?;
        Ok(StrokeDescriptor {
            stroke_id: previous.stroke_id,
            segment: previous.segment + 1,
            path,
            duration_ms,
            will_continue,
            pointer_type: previous.pointer_type.clone(),
        })
    }

    fn new_stroke(
        &self,
        path: StrokePath,
        duration_ms: u64,
        will_continue: bool,
        pointer_type: &str,
    ) -> Result<StrokeDescriptor, StrokeError> {
        validate(&path, duration_ms)?;
        Ok(StrokeDescriptor {
            stroke_id: StrokeId(self.ids.next_id()),
            segment: 0,
            path,
            duration_ms,
            will_continue,
            pointer_type: pointer_type.to_string(),
        })
    }
}

fn validate(path: &StrokePath, duration_ms: u64) -> Result<(), StrokeError> {
    for p in [path.from, path.to] {
        if !p.x.is_finite() || !p.y.is_finite() || p.x < 0.0 || p.y < 0.0 {
            return Err(StrokeError::InvalidCoordinate { x: p.x, y: p.y });
        }
    }
    if duration_ms == 0 {
        return Err(StrokeError::ZeroDuration);
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_builds_zero_length_first_segment() {
        // Arrange
        let synth = StrokeSynthesizer::new();

        // Act
        let stroke = synth.begin(Point::new(10.0, 20.0), 8, true, "touch").unwrap();

        // Assert
        assert!(stroke.path.is_zero_length());
        assert_eq!(stroke.segment, 0);
        assert!(stroke.will_continue);
        assert_eq!(stroke.pointer_type, "touch");
        assert_eq!(stroke.end_point(), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_each_new_stroke_gets_a_fresh_id() {
        let synth = StrokeSynthesizer::new();
        let a = synth.tap(Point::new(1.0, 1.0), 50).unwrap();
        let b = synth.tap(Point::new(1.0, 1.0), 50).unwrap();
        assert_ne!(a.stroke_id, b.stroke_id);
    }

    #[test]
    fn test_continuation_keeps_stroke_id_and_bumps_segment() {
        // Arrange
        let synth = StrokeSynthesizer::new();
        let first = synth.begin(Point::new(10.0, 10.0), 8, true, "mouse").unwrap();

        // Act
        let next = synth
            .continue_stroke(
                &first,
                StrokePath::line(Point::new(10.0, 10.0), Point::new(20.0, 20.0)),
                16,
                false,
            )
            .unwrap();

        // Assert
        assert_eq!(next.stroke_id, first.stroke_id);
        assert_eq!(next.segment, 1);
        assert_eq!(next.duration_ms, 16);
        assert!(!next.will_continue);
        assert_eq!(next.pointer_type, "mouse");
    }

    #[test]
    fn test_continuing_an_ended_stroke_fails() {
        let synth = StrokeSynthesizer::new();
        let tap = synth.tap(Point::new(5.0, 5.0), 50).unwrap();

        let result = synth.continue_stroke(&tap, StrokePath::at(Point::new(5.0, 5.0)), 8, false);

        assert_eq!(result, Err(StrokeError::StrokeEnded(tap.stroke_id)));
    }

    #[test]
    fn test_continuation_must_start_at_previous_end() {
        let synth = StrokeSynthesizer::new();
        let first = synth.begin(Point::new(10.0, 10.0), 8, true, "touch").unwrap();

        let result = synth.continue_stroke(
            &first,
            StrokePath::line(Point::new(11.0, 10.0), Point::new(20.0, 20.0)),
            8,
            true,
        );

        assert!(matches!(result, Err(StrokeError::Discontinuous { .. })));
    }

    #[test]
    fn test_negative_coordinate_is_rejected() {
        let synth = StrokeSynthesizer::new();
        let result = synth.tap(Point::new(-1.0, 5.0), 50);
        assert!(matches!(result, Err(StrokeError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_nan_coordinate_is_rejected() {
        let synth = StrokeSynthesizer::new();
        let result = synth.swipe(Point::new(0.0, 0.0), Point::new(f32::NAN, 5.0), 100);
        assert!(matches!(result, Err(StrokeError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let synth = StrokeSynthesizer::new();
        assert_eq!(
            synth.tap(Point::new(1.0, 1.0), 0),
            Err(StrokeError::ZeroDuration)
        );
    }

    #[test]
    fn test_swipe_is_a_single_ending_segment() {
        let synth = StrokeSynthesizer::new();
        let swipe = synth
            .swipe(Point::new(0.0, 100.0), Point::new(0.0, 500.0), 300)
            .unwrap();
        assert!(!swipe.will_continue);
        assert_eq!(swipe.path.from, Point::new(0.0, 100.0));
        assert_eq!(swipe.end_point(), Point::new(0.0, 500.0));
        assert_eq!(swipe.pointer_type, DEFAULT_POINTER_TYPE);
    }
}
