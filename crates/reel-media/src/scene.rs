//! Scene-change detection from sampled frames.
//!
//! Each frame is reduced to a color histogram (8 bins per RGB channel)
//! and compared against the previous frame with a chi-squared distance.
//! Large distances mark hard cuts and fast visual transitions; the raw
//! distances form the visual-change signal curve.

use metrics::counter;
use tracing::debug;

use reel_models::SignalCurve;

use crate::error::{MediaError, MediaResult};
use crate::sampler::Frame;

/// Bins per color channel. 8 bins keeps the histogram coarse enough to
/// ignore noise while still separating distinct shots.
const HISTOGRAM_BINS: usize = 8;

/// Guard against division by zero in the chi-squared sum.
const CHI_SQUARED_EPSILON: f64 = 1e-10;

/// Configuration for scene-change detection.
#[derive(Debug, Clone)]
pub struct SceneChangeConfig {
    /// Chi-squared distance above which a frame pair counts as a cut.
    pub cut_threshold: f64,
}

impl Default for SceneChangeConfig {
    fn default() -> Self {
        // Tuned on the 0..2 range of chi-squared over normalized
        // histograms; typical hard cuts land well above 0.5.
        Self { cut_threshold: 0.5 }
    }
}

/// Stateful detector fed frames in time order.
///
/// The first frame scores 0 (there is nothing to compare against);
/// every later frame scores its distance to the frame before it.
#[derive(Debug)]
pub struct SceneChangeDetector {
    config: SceneChangeConfig,
    prev_histogram: Option<Vec<f64>>,
    curve: SignalCurve,
    cuts_detected: u32,
}

impl SceneChangeDetector {
    pub fn new(config: SceneChangeConfig) -> Self {
        Self {
            config,
            prev_histogram: None,
            curve: SignalCurve::new(),
            cuts_detected: 0,
        }
    }

    /// Observe the next frame, returning its change score.
    pub fn observe(&mut self, frame: &Frame) -> MediaResult<f64> {
        let histogram = rgb_histogram(&frame.data);

        let score = match &self.prev_histogram {
            None => 0.0,
            Some(prev) => chi_squared_distance(prev, &histogram),
        };

        if score > self.config.cut_threshold {
            self.cuts_detected += 1;
            counter!("reel_scene_cuts_total").increment(1);
            debug!(t = frame.t, score = score, "Scene cut detected");
        }

        self.curve
            .push(frame.t, score)
            .map_err(|e| MediaError::internal(format!("Scene curve out of order: {}", e)))?;
        self.prev_histogram = Some(histogram);
        Ok(score)
    }

    /// Number of frame pairs whose distance crossed the cut threshold.
    pub fn cuts_detected(&self) -> u32 {
        self.cuts_detected
    }

    /// Consume the detector, yielding the visual-change curve.
    pub fn into_curve(self) -> SignalCurve {
        self.curve
    }
}

/// Normalized RGB histogram with [`HISTOGRAM_BINS`] bins per channel.
fn rgb_histogram(rgb24: &[u8]) -> Vec<f64> {
    let mut counts = vec![0u32; HISTOGRAM_BINS * 3];
    let bin_width = 256 / HISTOGRAM_BINS;

    for pixel in rgb24.chunks_exact(3) {
        for (channel, &byte) in pixel.iter().enumerate() {
            let bin = (byte as usize / bin_width).min(HISTOGRAM_BINS - 1);
            counts[channel * HISTOGRAM_BINS + bin] += 1;
        }
    }

    let total: u32 = counts.iter().take(HISTOGRAM_BINS).sum();
    let total = total.max(1) as f64;
    counts.iter().map(|&c| c as f64 / total).collect()
}

/// Chi-squared distance between two normalized histograms.
fn chi_squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = x - y;
            let sum = x + y;
            if sum > CHI_SQUARED_EPSILON {
                diff * diff / sum
            } else {
                0.0
            }
        })
        .sum::<f64>()
        / 3.0 // average over the three channels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(t: f64, r: u8, g: u8, b: u8) -> Frame {
        let data: Vec<u8> = [r, g, b].iter().copied().cycle().take(4 * 4 * 3).collect();
        Frame {
            t,
            width: 4,
            height: 4,
            data,
        }
    }

    #[test]
    fn test_first_frame_scores_zero() {
        let mut detector = SceneChangeDetector::new(SceneChangeConfig::default());
        let score = detector.observe(&solid_frame(0.0, 200, 10, 10)).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_identical_frames_score_zero() {
        let mut detector = SceneChangeDetector::new(SceneChangeConfig::default());
        detector.observe(&solid_frame(0.0, 128, 128, 128)).unwrap();
        let score = detector.observe(&solid_frame(0.5, 128, 128, 128)).unwrap();
        assert!(score.abs() < 1e-9);
        assert_eq!(detector.cuts_detected(), 0);
    }

    #[test]
    fn test_hard_cut_scores_high() {
        let mut detector = SceneChangeDetector::new(SceneChangeConfig::default());
        detector.observe(&solid_frame(0.0, 255, 0, 0)).unwrap();
        let score = detector.observe(&solid_frame(0.5, 0, 0, 255)).unwrap();
        assert!(score > SceneChangeConfig::default().cut_threshold);
        assert_eq!(detector.cuts_detected(), 1);
    }

    #[test]
    fn test_curve_matches_frame_timestamps() {
        let mut detector = SceneChangeDetector::new(SceneChangeConfig::default());
        detector.observe(&solid_frame(0.0, 10, 10, 10)).unwrap();
        detector.observe(&solid_frame(0.5, 10, 10, 10)).unwrap();
        detector.observe(&solid_frame(1.0, 250, 250, 250)).unwrap();
        let curve = detector.into_curve();
        assert_eq!(curve.len(), 3);
        assert!((curve.points()[2].t - 1.0).abs() < 1e-9);
        assert!(curve.points()[2].value > 0.0);
    }

    #[test]
    fn test_histogram_is_normalized() {
        let hist = rgb_histogram(&solid_frame(0.0, 0, 128, 255).data);
        let per_channel: f64 = hist.iter().take(HISTOGRAM_BINS).sum();
        assert!((per_channel - 1.0).abs() < 1e-9);
    }
}
