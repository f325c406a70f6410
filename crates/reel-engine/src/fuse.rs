//! Signal normalization and fusion.
//!
//! The three analyzer curves arrive on their own scales (chi-squared
//! distance, RMS energy, detection score) and possibly their own
//! grids. Fusion first resamples every curve onto one uniform grid,
//! rescales each to [0, 1], then combines them as a weighted sum into
//! the single saliency curve the selector consumes.

use tracing::debug;

use reel_models::{SignalCurve, SignalWeights};

use crate::error::EngineResult;

/// How a raw curve is rescaled to [0, 1] before fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationMode {
    /// `(v - min) / (max - min)`. Simple and monotonic; one extreme
    /// outlier compresses everything else.
    #[default]
    MinMax,
    /// Z-score clipped to +/-3 standard deviations, shifted to [0, 1].
    /// Robust to single outlier spikes.
    ClippedZScore,
}

/// Guard against near-flat curves where the scale collapses.
const FLAT_EPSILON: f64 = 1e-9;

const ZSCORE_CLIP: f64 = 3.0;

/// Rescale a curve to [0, 1].
///
/// A flat curve carries no ranking information, so it normalizes to
/// all zeros rather than an arbitrary constant.
pub fn normalize(curve: &SignalCurve, mode: NormalizationMode) -> SignalCurve {
    match mode {
        NormalizationMode::MinMax => normalize_min_max(curve),
        NormalizationMode::ClippedZScore => normalize_zscore(curve),
    }
}

fn normalize_min_max(curve: &SignalCurve) -> SignalCurve {
    let min = curve.min_value();
    let max = curve.max_value();
    let range = max - min;
    if range < FLAT_EPSILON {
        return SignalCurve::zeros_like(curve);
    }
    map_values(curve, |v| (v - min) / range)
}

fn normalize_zscore(curve: &SignalCurve) -> SignalCurve {
    let n = curve.len();
    if n == 0 {
        return SignalCurve::new();
    }
    let mean = curve.values().sum::<f64>() / n as f64;
    let variance = curve.values().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    let std_dev = variance.sqrt();
    if std_dev < FLAT_EPSILON {
        return SignalCurve::zeros_like(curve);
    }
    map_values(curve, |v| {
        let z = ((v - mean) / std_dev).clamp(-ZSCORE_CLIP, ZSCORE_CLIP);
        (z + ZSCORE_CLIP) / (2.0 * ZSCORE_CLIP)
    })
}

/// Apply `f` to every value, keeping timestamps. The closure must
/// return non-negative finite values; both normalizers do.
fn map_values(curve: &SignalCurve, f: impl Fn(f64) -> f64) -> SignalCurve {
    let mut out = SignalCurve::new();
    for point in curve.points() {
        // Timestamps come straight from a valid curve, so pushing in
        // order cannot fail.
        let _ = out.push(point.t, f(point.value).max(0.0));
    }
    out
}

/// Fuse the three normalized signals into one saliency curve on a
/// uniform `step`-second grid covering `[0, duration)`.
pub fn fuse_signals(
    visual: &SignalCurve,
    audio: &SignalCurve,
    recognition: &SignalCurve,
    weights: SignalWeights,
    mode: NormalizationMode,
    step: f64,
    duration: f64,
) -> EngineResult<SignalCurve> {
    let weights = weights.normalized();

    let visual = normalize(&visual.resample(step, duration), mode);
    let audio = normalize(&audio.resample(step, duration), mode);
    let recognition = normalize(&recognition.resample(step, duration), mode);

    debug_assert_eq!(visual.len(), audio.len());
    debug_assert_eq!(visual.len(), recognition.len());

    let mut fused = SignalCurve::new();
    for i in 0..visual.len() {
        let t = visual.points()[i].t;
        let value = weights.visual * visual.points()[i].value
            + weights.audio * audio.points()[i].value
            + weights.recognition * recognition.points()[i].value;
        fused.push(t, value)?;
    }

    debug!(
        samples = fused.len(),
        max = fused.max_value(),
        "Signals fused"
    );
    Ok(fused)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(values: &[f64]) -> SignalCurve {
        SignalCurve::from_points(values.iter().enumerate().map(|(i, &v)| (i as f64, v))).unwrap()
    }

    #[test]
    fn test_min_max_spans_unit_interval() {
        let normalized = normalize(&curve(&[2.0, 4.0, 6.0]), NormalizationMode::MinMax);
        assert!((normalized.min_value() - 0.0).abs() < 1e-9);
        assert!((normalized.max_value() - 1.0).abs() < 1e-9);
        assert!((normalized.points()[1].value - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_flat_curve_normalizes_to_zeros() {
        let normalized = normalize(&curve(&[3.0, 3.0, 3.0]), NormalizationMode::MinMax);
        assert!(normalized.values().all(|v| v == 0.0));
        let normalized = normalize(&curve(&[3.0, 3.0, 3.0]), NormalizationMode::ClippedZScore);
        assert!(normalized.values().all(|v| v == 0.0));
    }

    #[test]
    fn test_zscore_bounded() {
        let normalized = normalize(
            &curve(&[0.0, 0.0, 0.0, 0.0, 1000.0]),
            NormalizationMode::ClippedZScore,
        );
        assert!(normalized.values().all(|v| (0.0..=1.0).contains(&v)));
        // The spike still ranks highest.
        let max_idx = normalized
            .points()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.value.total_cmp(&b.1.value))
            .map(|(i, _)| i);
        assert_eq!(max_idx, Some(4));
    }

    #[test]
    fn test_normalization_preserves_ranking() {
        let raw = curve(&[1.0, 5.0, 3.0, 9.0]);
        for mode in [NormalizationMode::MinMax, NormalizationMode::ClippedZScore] {
            let normalized = normalize(&raw, mode);
            let v = normalized.points();
            assert!(v[3].value > v[1].value);
            assert!(v[1].value > v[2].value);
            assert!(v[2].value > v[0].value);
        }
    }

    #[test]
    fn test_fused_values_in_unit_interval() {
        let fused = fuse_signals(
            &curve(&[0.0, 10.0, 5.0, 2.0]),
            &curve(&[1.0, 1.0, 8.0, 2.0]),
            &curve(&[0.0, 0.0, 0.0, 4.0]),
            SignalWeights::default(),
            NormalizationMode::MinMax,
            1.0,
            4.0,
        )
        .unwrap();
        assert_eq!(fused.len(), 4);
        assert!(fused.values().all(|v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_zero_weight_mutes_signal() {
        let loud_audio = curve(&[0.0, 100.0]);
        let quiet_visual = curve(&[0.0, 0.0]);
        let weights = SignalWeights::new(1.0, 0.0, 0.0).unwrap();
        let fused = fuse_signals(
            &quiet_visual,
            &loud_audio,
            &quiet_visual,
            weights,
            NormalizationMode::MinMax,
            1.0,
            2.0,
        )
        .unwrap();
        assert!(fused.values().all(|v| v == 0.0));
    }

    #[test]
    fn test_fusion_resamples_mismatched_grids() {
        // Visual at 0.5s spacing, audio at 1s spacing.
        let visual =
            SignalCurve::from_points([(0.0, 0.0), (0.5, 1.0), (1.0, 2.0), (1.5, 3.0)]).unwrap();
        let audio = SignalCurve::from_points([(0.0, 5.0), (1.0, 10.0)]).unwrap();
        let fused = fuse_signals(
            &visual,
            &audio,
            &SignalCurve::new(),
            SignalWeights::default(),
            NormalizationMode::MinMax,
            0.5,
            2.0,
        )
        .unwrap();
        assert_eq!(fused.len(), 4);
    }
}
