//! Time-indexed signal curves.
//!
//! A [`SignalCurve`] is an ordered sequence of `(t, value)` pairs from
//! one analysis modality (visual change, audio energy, recognized
//! activity). Curves are produced once per input video and immutable
//! thereafter; every transform (resampling, fusion) produces a new
//! curve rather than mutating in place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error building a signal curve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("Curve timestamps must be strictly increasing: {prev} then {next}")]
    NonMonotonicTime { prev: f64, next: f64 },

    #[error("Curve values must be finite and non-negative, got {0} at t={1}")]
    InvalidValue(f64, f64),
}

/// A single `(t, value)` sample on a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Timestamp in seconds.
    pub t: f64,
    /// Non-negative score on the signal's own scale.
    pub value: f64,
}

/// An ordered sequence of `(t, value)` pairs, strictly increasing in
/// `t`, with non-negative values on an arbitrary per-signal scale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalCurve {
    points: Vec<CurvePoint>,
}

impl SignalCurve {
    /// Create an empty curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a curve from `(t, value)` pairs, validating monotonicity
    /// and value range.
    pub fn from_points<I>(points: I) -> Result<Self, CurveError>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut curve = Self::new();
        for (t, value) in points {
            curve.push(t, value)?;
        }
        Ok(curve)
    }

    /// A curve of all zeros on a uniform grid of `len` samples spaced
    /// `step` seconds apart, starting at 0.
    ///
    /// Used for signals that are unavailable (missing audio track,
    /// absent recognition model) but must still cover the timeline.
    pub fn zeros(step: f64, len: usize) -> Self {
        let points = (0..len)
            .map(|i| CurvePoint {
                t: i as f64 * step,
                value: 0.0,
            })
            .collect();
        Self { points }
    }

    /// A curve with the same timestamps as `other` but all zeros.
    pub fn zeros_like(other: &SignalCurve) -> Self {
        let points = other
            .points
            .iter()
            .map(|p| CurvePoint { t: p.t, value: 0.0 })
            .collect();
        Self { points }
    }

    /// Append a sample. Timestamps must strictly increase.
    pub fn push(&mut self, t: f64, value: f64) -> Result<(), CurveError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CurveError::InvalidValue(value, t));
        }
        if let Some(last) = self.points.last() {
            if t <= last.t {
                return Err(CurveError::NonMonotonicTime {
                    prev: last.t,
                    next: t,
                });
            }
        }
        self.points.push(CurvePoint { t, value });
        Ok(())
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the curve has no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The samples in time order.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// The raw values in time order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Minimum value, or 0 for an empty curve.
    pub fn min_value(&self) -> f64 {
        self.values()
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.min(v)))
            })
            .unwrap_or(0.0)
    }

    /// Maximum value, or 0 for an empty curve.
    pub fn max_value(&self) -> f64 {
        self.values()
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |a| a.max(v)))
            })
            .unwrap_or(0.0)
    }

    /// Value at time `t` by linear interpolation between the two
    /// surrounding samples.
    ///
    /// Outside the sampled range the nearest sample's value is used
    /// (clamped, never extrapolated). Returns 0 for an empty curve.
    pub fn sample_at(&self, t: f64) -> f64 {
        match self.points.as_slice() {
            [] => 0.0,
            [only] => only.value,
            points => {
                if t <= points[0].t {
                    return points[0].value;
                }
                if t >= points[points.len() - 1].t {
                    return points[points.len() - 1].value;
                }
                // Binary search for the surrounding pair.
                let idx = points.partition_point(|p| p.t <= t);
                let lo = &points[idx - 1];
                let hi = &points[idx];
                let span = hi.t - lo.t;
                if span <= f64::EPSILON {
                    return lo.value;
                }
                let frac = (t - lo.t) / span;
                lo.value + frac * (hi.value - lo.value)
            }
        }
    }

    /// Resample onto a uniform grid of `step` seconds covering
    /// `[0, duration)`, by linear interpolation.
    ///
    /// This is the precondition for fusion: curves are never combined
    /// on mismatched grids.
    pub fn resample(&self, step: f64, duration: f64) -> SignalCurve {
        debug_assert!(step > 0.0 && duration > 0.0);
        let len = (duration / step).ceil() as usize;
        let len = len.max(1);
        let points = (0..len)
            .map(|i| {
                let t = i as f64 * step;
                CurvePoint {
                    t,
                    value: self.sample_at(t),
                }
            })
            .collect();
        SignalCurve { points }
    }

    /// Integral of the curve over `[start, end)` treating each sample
    /// as holding its value until the next sample (left-step rule).
    ///
    /// Deterministic and exact on uniform grids, which is what the
    /// selector scores windows on.
    pub fn integral_over(&self, start: f64, end: f64) -> f64 {
        if end <= start || self.points.is_empty() {
            return 0.0;
        }
        let mut total = 0.0;
        for (i, point) in self.points.iter().enumerate() {
            let seg_start = point.t;
            let seg_end = match self.points.get(i + 1) {
                Some(next) => next.t,
                // Last sample holds until `end`.
                None => end.max(seg_start),
            };
            let lo = seg_start.max(start);
            let hi = seg_end.min(end);
            if hi > lo {
                total += point.value * (hi - lo);
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_enforces_monotonic_time() {
        let mut curve = SignalCurve::new();
        curve.push(0.0, 1.0).unwrap();
        curve.push(1.0, 2.0).unwrap();
        assert!(matches!(
            curve.push(1.0, 3.0),
            Err(CurveError::NonMonotonicTime { .. })
        ));
        assert!(matches!(
            curve.push(0.5, 3.0),
            Err(CurveError::NonMonotonicTime { .. })
        ));
    }

    #[test]
    fn test_push_rejects_negative_values() {
        let mut curve = SignalCurve::new();
        assert!(matches!(
            curve.push(0.0, -1.0),
            Err(CurveError::InvalidValue(_, _))
        ));
        assert!(curve.push(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_sample_at_interpolates() {
        let curve = SignalCurve::from_points([(0.0, 0.0), (1.0, 2.0)]).unwrap();
        assert!((curve.sample_at(0.5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_at_clamps_at_edges() {
        let curve = SignalCurve::from_points([(1.0, 4.0), (2.0, 8.0)]).unwrap();
        // No extrapolation outside the sampled range.
        assert!((curve.sample_at(0.0) - 4.0).abs() < 1e-9);
        assert!((curve.sample_at(5.0) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_at_empty_and_single() {
        assert_eq!(SignalCurve::new().sample_at(1.0), 0.0);
        let single = SignalCurve::from_points([(3.0, 7.0)]).unwrap();
        assert!((single.sample_at(100.0) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_resample_covers_duration() {
        let curve = SignalCurve::from_points([(0.0, 0.0), (10.0, 10.0)]).unwrap();
        let resampled = curve.resample(1.0, 10.0);
        assert_eq!(resampled.len(), 10);
        assert!((resampled.points()[5].value - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zeros() {
        let curve = SignalCurve::zeros(0.5, 4);
        assert_eq!(curve.len(), 4);
        assert!(curve.values().all(|v| v == 0.0));
        assert!((curve.points()[3].t - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_integral_uniform_grid() {
        // Value 2.0 held over [0, 4) at 1s spacing -> integral 8.
        let curve =
            SignalCurve::from_points([(0.0, 2.0), (1.0, 2.0), (2.0, 2.0), (3.0, 2.0)]).unwrap();
        assert!((curve.integral_over(0.0, 4.0) - 8.0).abs() < 1e-9);
        // Partial range.
        assert!((curve.integral_over(1.5, 2.5) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_integral_empty_range() {
        let curve = SignalCurve::from_points([(0.0, 1.0)]).unwrap();
        assert_eq!(curve.integral_over(5.0, 5.0), 0.0);
        assert_eq!(curve.integral_over(5.0, 2.0), 0.0);
    }

    #[test]
    fn test_min_max() {
        let curve = SignalCurve::from_points([(0.0, 3.0), (1.0, 1.0), (2.0, 5.0)]).unwrap();
        assert!((curve.min_value() - 1.0).abs() < 1e-9);
        assert!((curve.max_value() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_serde_round_trip() {
        let curve = SignalCurve::from_points([(0.0, 1.0), (0.5, 2.5)]).unwrap();
        let json = serde_json::to_string(&curve).unwrap();
        let back: SignalCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(curve, back);
    }
}
