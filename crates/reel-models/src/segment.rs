//! Segments and segment plans.
//!
//! A [`Segment`] is a contiguous time range selected for inclusion in
//! the final highlight reel. A [`SegmentPlan`] is the selector's
//! output: non-overlapping segments sorted by start time, created once
//! per run and consumed by the export adapter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error constructing a segment or plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Segment start {start} must be before end {end}")]
    InvertedSegment { start: f64, end: f64 },

    #[error("Segment start {0} must be non-negative")]
    NegativeStart(f64),

    #[error("Plan segments must be sorted by start and non-overlapping: [{prev_start}, {prev_end}) then [{next_start}, {next_end})")]
    OverlapOrDisorder {
        prev_start: f64,
        prev_end: f64,
        next_start: f64,
        next_end: f64,
    },
}

/// A contiguous `[start, end)` time range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds (exclusive).
    pub end: f64,
}

impl Segment {
    /// Create a segment, validating `0 <= start < end`.
    pub fn new(start: f64, end: f64) -> Result<Self, PlanError> {
        if start < 0.0 {
            return Err(PlanError::NegativeStart(start));
        }
        if end <= start {
            return Err(PlanError::InvertedSegment { start, end });
        }
        Ok(Self { start, end })
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether this segment overlaps another.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether this segment is adjacent to (ends exactly where the
    /// other begins, within `tol` seconds) another.
    pub fn adjacent_to(&self, other: &Segment, tol: f64) -> bool {
        (self.end - other.start).abs() <= tol || (other.end - self.start).abs() <= tol
    }
}

/// A segment together with its fused-saliency integral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredSegment {
    pub segment: Segment,
    /// Integral of the fused saliency curve over the segment.
    pub score: f64,
}

/// An ordered sequence of non-overlapping segments sorted by start.
///
/// Never mutated after creation; the export adapter consumes it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    segments: Vec<Segment>,
}

impl SegmentPlan {
    /// Build a plan, validating ordering and disjointness.
    pub fn new(segments: Vec<Segment>) -> Result<Self, PlanError> {
        for pair in segments.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start < prev.end {
                return Err(PlanError::OverlapOrDisorder {
                    prev_start: prev.start,
                    prev_end: prev.end,
                    next_start: next.start,
                    next_end: next.end,
                });
            }
        }
        Ok(Self { segments })
    }

    /// The degenerate whole-video plan `[(0, T)]`, used when the video
    /// is no longer than the target duration.
    pub fn whole_video(duration: f64) -> Result<Self, PlanError> {
        Ok(Self {
            segments: vec![Segment::new(0.0, duration)?],
        })
    }

    /// The segments in playback (chronological) order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of segment durations in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(Segment::duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_validation() {
        assert!(Segment::new(0.0, 1.0).is_ok());
        assert!(matches!(
            Segment::new(1.0, 1.0),
            Err(PlanError::InvertedSegment { .. })
        ));
        assert!(matches!(
            Segment::new(2.0, 1.0),
            Err(PlanError::InvertedSegment { .. })
        ));
        assert!(matches!(
            Segment::new(-1.0, 1.0),
            Err(PlanError::NegativeStart(_))
        ));
    }

    #[test]
    fn test_segment_overlap() {
        let a = Segment::new(0.0, 2.0).unwrap();
        let b = Segment::new(1.0, 3.0).unwrap();
        let c = Segment::new(2.0, 4.0).unwrap();
        assert!(a.overlaps(&b));
        // Half-open intervals: touching segments do not overlap.
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_plan_rejects_overlap() {
        let segments = vec![
            Segment::new(0.0, 5.0).unwrap(),
            Segment::new(4.0, 8.0).unwrap(),
        ];
        assert!(matches!(
            SegmentPlan::new(segments),
            Err(PlanError::OverlapOrDisorder { .. })
        ));
    }

    #[test]
    fn test_plan_rejects_disorder() {
        let segments = vec![
            Segment::new(10.0, 12.0).unwrap(),
            Segment::new(0.0, 5.0).unwrap(),
        ];
        assert!(SegmentPlan::new(segments).is_err());
    }

    #[test]
    fn test_plan_total_duration() {
        let plan = SegmentPlan::new(vec![
            Segment::new(0.0, 2.0).unwrap(),
            Segment::new(5.0, 10.0).unwrap(),
        ])
        .unwrap();
        assert!((plan.total_duration() - 7.0).abs() < 1e-9);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_whole_video_plan() {
        let plan = SegmentPlan::whole_video(30.0).unwrap();
        assert_eq!(plan.len(), 1);
        assert!((plan.segments()[0].start - 0.0).abs() < 1e-9);
        assert!((plan.segments()[0].end - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_adjacent_segments_allowed_in_plan() {
        let plan = SegmentPlan::new(vec![
            Segment::new(0.0, 2.0).unwrap(),
            Segment::new(2.0, 4.0).unwrap(),
        ]);
        assert!(plan.is_ok());
    }
}
