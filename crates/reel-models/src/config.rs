//! Highlight generation configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default highlight reel length in seconds.
pub const DEFAULT_TARGET_DURATION: f64 = 44.0;

/// Default spacing between sampled frames in seconds.
pub const DEFAULT_SAMPLING_INTERVAL: f64 = 0.5;

/// Default candidate window length for the selector in seconds.
pub const DEFAULT_WINDOW_GRANULARITY: f64 = 2.0;

/// Tolerance when comparing weight sums to 1.0.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Error validating configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("Signal weights must be non-negative, got ({visual}, {audio}, {recognition})")]
    NegativeWeight {
        visual: f64,
        audio: f64,
        recognition: f64,
    },

    #[error("Signal weights must sum to a positive value, got {0}")]
    ZeroSum(f64),
}

/// Per-signal fusion weights. Combined weights are normalized so the
/// three always sum to 1 before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub visual: f64,
    pub audio: f64,
    pub recognition: f64,
}

impl Default for SignalWeights {
    /// Equal weighting across the three modalities.
    fn default() -> Self {
        Self {
            visual: 1.0 / 3.0,
            audio: 1.0 / 3.0,
            recognition: 1.0 / 3.0,
        }
    }
}

impl SignalWeights {
    /// Create weights, validating non-negativity and a positive sum.
    pub fn new(visual: f64, audio: f64, recognition: f64) -> Result<Self, WeightError> {
        if visual < 0.0 || audio < 0.0 || recognition < 0.0 {
            return Err(WeightError::NegativeWeight {
                visual,
                audio,
                recognition,
            });
        }
        let sum = visual + audio + recognition;
        if sum <= WEIGHT_SUM_TOLERANCE {
            return Err(WeightError::ZeroSum(sum));
        }
        Ok(Self {
            visual,
            audio,
            recognition,
        })
    }

    /// Weights rescaled to sum exactly to 1.
    pub fn normalized(&self) -> Self {
        let sum = self.visual + self.audio + self.recognition;
        Self {
            visual: self.visual / sum,
            audio: self.audio / sum,
            recognition: self.recognition / sum,
        }
    }

    /// Whether the weights already sum to 1 (within tolerance).
    pub fn is_normalized(&self) -> bool {
        ((self.visual + self.audio + self.recognition) - 1.0).abs() < WEIGHT_SUM_TOLERANCE
    }
}

/// Configuration for one highlight-generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Spacing between sampled frames in seconds.
    pub sampling_interval: f64,
    /// Target total duration of the highlight reel in seconds.
    pub target_duration: f64,
    /// Per-signal fusion weights.
    pub weights: SignalWeights,
    /// Candidate window length for the selector in seconds.
    pub window_granularity: f64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            target_duration: DEFAULT_TARGET_DURATION,
            weights: SignalWeights::default(),
            window_granularity: DEFAULT_WINDOW_GRANULARITY,
        }
    }
}

impl HighlightConfig {
    /// Set the target reel duration.
    pub fn with_target_duration(mut self, secs: f64) -> Self {
        self.target_duration = secs;
        self
    }

    /// Set the frame sampling interval.
    pub fn with_sampling_interval(mut self, secs: f64) -> Self {
        self.sampling_interval = secs;
        self
    }

    /// Set the selector window granularity.
    pub fn with_window_granularity(mut self, secs: f64) -> Self {
        self.window_granularity = secs;
        self
    }

    /// Set the fusion weights.
    pub fn with_weights(mut self, weights: SignalWeights) -> Self {
        self.weights = weights;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!(SignalWeights::default().is_normalized());
    }

    #[test]
    fn test_weights_reject_negative() {
        assert!(matches!(
            SignalWeights::new(-0.1, 0.6, 0.5),
            Err(WeightError::NegativeWeight { .. })
        ));
    }

    #[test]
    fn test_weights_reject_zero_sum() {
        assert!(matches!(
            SignalWeights::new(0.0, 0.0, 0.0),
            Err(WeightError::ZeroSum(_))
        ));
    }

    #[test]
    fn test_weights_normalize() {
        let w = SignalWeights::new(2.0, 1.0, 1.0).unwrap().normalized();
        assert!((w.visual - 0.5).abs() < 1e-9);
        assert!((w.audio - 0.25).abs() < 1e-9);
        assert!(w.is_normalized());
    }

    #[test]
    fn test_config_defaults() {
        let config = HighlightConfig::default();
        assert!((config.target_duration - 44.0).abs() < 1e-9);
        assert!((config.window_granularity - 2.0).abs() < 1e-9);
        assert!(config.sampling_interval > 0.0);
    }

    #[test]
    fn test_config_builders() {
        let config = HighlightConfig::default()
            .with_target_duration(60.0)
            .with_window_granularity(3.0);
        assert!((config.target_duration - 60.0).abs() < 1e-9);
        assert!((config.window_granularity - 3.0).abs() < 1e-9);
    }
}
