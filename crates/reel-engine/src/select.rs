//! Segment selection over the fused saliency curve.
//!
//! The timeline is partitioned into fixed-length candidate windows,
//! each scored by the integral of the fused curve across it. Windows
//! are taken greedily by score until the target duration is covered,
//! then adjacent picks are merged into maximal segments and the plan
//! is emitted in chronological order.

use tracing::{debug, info};

use reel_models::{ScoredSegment, Segment, SegmentPlan, SignalCurve, Timeline};

use crate::error::EngineResult;

/// Partition the timeline into `granularity`-second windows and score
/// each one. The final window absorbs the remainder and may be short.
pub fn score_windows(
    fused: &SignalCurve,
    timeline: &Timeline,
    granularity: f64,
) -> EngineResult<Vec<ScoredSegment>> {
    let duration = timeline.duration();
    let count = (duration / granularity).ceil() as usize;
    let mut windows = Vec::with_capacity(count);

    for i in 0..count {
        let start = i as f64 * granularity;
        let end = (start + granularity).min(duration);
        if end <= start {
            break;
        }
        let segment = Segment::new(start, end)?;
        windows.push(ScoredSegment {
            segment,
            score: fused.integral_over(start, end),
        });
    }
    Ok(windows)
}

/// Select segments totaling at least `target_duration` seconds.
///
/// The plan's total runs over the target by at most one window, never
/// under it (unless the whole video is shorter than the target, in
/// which case the plan is the entire video). Ties between equal-score
/// windows break toward the earlier window, so the same inputs always
/// produce the same plan.
pub fn select_segments(
    fused: &SignalCurve,
    timeline: &Timeline,
    target_duration: f64,
    granularity: f64,
) -> EngineResult<SegmentPlan> {
    let duration = timeline.duration();
    if duration <= target_duration {
        info!(
            duration = duration,
            target = target_duration,
            "Video no longer than target, selecting whole video"
        );
        return Ok(SegmentPlan::whole_video(duration)?);
    }

    let windows = score_windows(fused, timeline, granularity)?;

    let mut order: Vec<usize> = (0..windows.len()).collect();
    order.sort_by(|&a, &b| {
        windows[b]
            .score
            .total_cmp(&windows[a].score)
            .then(windows[a].segment.start.total_cmp(&windows[b].segment.start))
    });

    let mut selected = Vec::new();
    let mut covered = 0.0;
    for &idx in &order {
        selected.push(idx);
        covered += windows[idx].segment.duration();
        if covered >= target_duration {
            break;
        }
    }

    selected.sort_unstable();
    let segments = merge_adjacent(&windows, &selected);

    debug!(
        windows = windows.len(),
        picked = selected.len(),
        segments = segments.len(),
        covered = covered,
        "Segment selection complete"
    );

    Ok(SegmentPlan::new(segments)?)
}

/// Merge runs of consecutive window indices into single segments.
/// `indices` must be sorted ascending.
fn merge_adjacent(windows: &[ScoredSegment], indices: &[usize]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for &idx in indices {
        let window = windows[idx].segment;
        match segments.last_mut() {
            Some(last) if (last.end - window.start).abs() < 1e-9 => {
                last.end = window.end;
            }
            _ => segments.push(window),
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(duration: f64) -> Timeline {
        Timeline::new(duration).unwrap()
    }

    /// Uniform 1s-grid curve from raw values.
    fn curve(values: &[f64]) -> SignalCurve {
        SignalCurve::from_points(values.iter().enumerate().map(|(i, &v)| (i as f64, v))).unwrap()
    }

    #[test]
    fn test_short_video_selects_whole() {
        let plan = select_segments(&curve(&[1.0; 30]), &timeline(30.0), 44.0, 2.0).unwrap();
        assert_eq!(plan.len(), 1);
        assert!((plan.total_duration() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_length_video_selects_whole() {
        let plan = select_segments(&curve(&[1.0; 44]), &timeline(44.0), 44.0, 2.0).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_covers_target_within_one_window() {
        let plan = select_segments(&curve(&[1.0; 120]), &timeline(120.0), 44.0, 2.0).unwrap();
        let total = plan.total_duration();
        assert!(total >= 44.0);
        assert!(total < 44.0 + 2.0);
    }

    #[test]
    fn test_picks_highest_scoring_region() {
        // Saliency concentrated in [60, 70).
        let mut values = vec![0.0; 120];
        for v in values.iter_mut().take(70).skip(60) {
            *v = 10.0;
        }
        let plan = select_segments(&curve(&values), &timeline(120.0), 8.0, 2.0).unwrap();
        for segment in plan.segments() {
            assert!(segment.start >= 58.0 && segment.end <= 72.0);
        }
    }

    #[test]
    fn test_plan_is_chronological_and_disjoint() {
        let mut values = vec![0.0; 200];
        values[10] = 5.0;
        values[150] = 5.0;
        values[80] = 5.0;
        let plan = select_segments(&curve(&values), &timeline(200.0), 12.0, 2.0).unwrap();
        let segments = plan.segments();
        for pair in segments.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_adjacent_windows_merge() {
        // One long hot region spanning many windows.
        let mut values = vec![0.0; 100];
        for v in values.iter_mut().take(40).skip(20) {
            *v = 10.0;
        }
        let plan = select_segments(&curve(&values), &timeline(100.0), 16.0, 2.0).unwrap();
        // All picks land in the hot region and fuse into one segment.
        assert_eq!(plan.len(), 1);
        assert!(plan.segments()[0].start >= 18.0);
    }

    #[test]
    fn test_flat_curve_is_deterministic() {
        let flat = curve(&[0.0; 100]);
        let a = select_segments(&flat, &timeline(100.0), 10.0, 2.0).unwrap();
        let b = select_segments(&flat, &timeline(100.0), 10.0, 2.0).unwrap();
        assert_eq!(a, b);
        // Ties break toward earlier windows.
        assert!((a.segments()[0].start - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_ragged_final_window() {
        let windows = score_windows(&curve(&[1.0; 11]), &timeline(11.0), 2.0).unwrap();
        assert_eq!(windows.len(), 6);
        let last = windows.last().unwrap().segment;
        assert!((last.duration() - 1.0).abs() < 1e-9);
        assert!((last.end - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_scores_are_integrals() {
        let windows = score_windows(&curve(&[2.0; 10]), &timeline(10.0), 2.0).unwrap();
        for w in &windows {
            assert!((w.score - 4.0).abs() < 1e-9);
        }
    }
}
