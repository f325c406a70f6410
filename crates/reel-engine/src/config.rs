//! Engine configuration.
//!
//! Every knob has a default suitable for a short-form highlight reel;
//! the environment overrides individual values without a config file.

use std::path::PathBuf;

use reel_models::{HighlightConfig, SignalWeights};

use crate::error::{EngineError, EngineResult};

/// Full configuration for one engine run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sampling, weights, target duration, selector granularity.
    pub highlight: HighlightConfig,
    /// Path to the recognition ONNX model. A missing file degrades the
    /// recognition signal to zero instead of failing the run.
    pub model_path: PathBuf,
    /// Sampling interval for the recognition pass. Inference is the
    /// slowest analyzer, so it may run on a coarser grid than the
    /// visual pass.
    pub recognition_interval: f64,
    /// Audio decode sample rate in Hz.
    pub audio_sample_rate: u32,
    /// Per-FFmpeg-invocation timeout during export, in seconds.
    pub export_timeout_secs: u64,
    /// Normalize signals with a clipped z-score instead of min-max.
    pub zscore_normalization: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            highlight: HighlightConfig::default(),
            model_path: PathBuf::from("models/yolov8n.onnx"),
            recognition_interval: 1.0,
            audio_sample_rate: 16_000,
            export_timeout_secs: 600,
            zscore_normalization: false,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let highlight = HighlightConfig::default()
            .with_target_duration(env_f64(
                "REEL_TARGET_DURATION",
                defaults.highlight.target_duration,
            ))
            .with_sampling_interval(env_f64(
                "REEL_SAMPLING_INTERVAL",
                defaults.highlight.sampling_interval,
            ))
            .with_window_granularity(env_f64(
                "REEL_WINDOW_GRANULARITY",
                defaults.highlight.window_granularity,
            ))
            .with_weights(weights_from_env());

        Self {
            highlight,
            model_path: std::env::var("REEL_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            recognition_interval: env_f64("REEL_RECOGNITION_INTERVAL", defaults.recognition_interval),
            audio_sample_rate: std::env::var("REEL_AUDIO_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.audio_sample_rate),
            export_timeout_secs: std::env::var("REEL_EXPORT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.export_timeout_secs),
            zscore_normalization: std::env::var("REEL_ZSCORE_NORMALIZATION")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.zscore_normalization),
        }
    }

    /// Validate cross-field constraints before a run.
    pub fn validate(&self) -> EngineResult<()> {
        if self.highlight.sampling_interval <= 0.0 {
            return Err(EngineError::invalid_config(
                "Sampling interval must be positive",
            ));
        }
        if self.highlight.target_duration <= 0.0 {
            return Err(EngineError::invalid_config(
                "Target duration must be positive",
            ));
        }
        if self.highlight.window_granularity <= 0.0 {
            return Err(EngineError::invalid_config(
                "Window granularity must be positive",
            ));
        }
        if self.recognition_interval < self.highlight.sampling_interval {
            return Err(EngineError::invalid_config(
                "Recognition interval cannot be finer than the sampling interval",
            ));
        }
        Ok(())
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Fusion weights from `REEL_WEIGHT_{VISUAL,AUDIO,RECOGNITION}`.
/// Invalid combinations (negative, all zero) fall back to equal
/// weighting; the weights are normalized before use either way.
fn weights_from_env() -> SignalWeights {
    let defaults = SignalWeights::default();
    SignalWeights::new(
        env_f64("REEL_WEIGHT_VISUAL", defaults.visual),
        env_f64("REEL_WEIGHT_AUDIO", defaults.audio),
        env_f64("REEL_WEIGHT_RECOGNITION", defaults.recognition),
    )
    .unwrap_or(defaults)
}
