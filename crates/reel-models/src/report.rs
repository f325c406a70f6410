//! Read-only analysis statistics surfaced to the caller.

use serde::{Deserialize, Serialize};

/// Summary of one analysis run, for display alongside the plan
/// ("X scenes detected, Y seconds of audio peaks used").
///
/// Recoverable degradations (missing audio, failed recognition frames)
/// are counted here rather than aborting the run, so the caller can
/// reflect reduced confidence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Number of scene boundaries the visual detector flagged.
    pub scenes_detected: usize,
    /// Seconds of selected plan time attributable to audio peaks.
    pub audio_peak_seconds: f64,
    /// Sampled frames whose recognition score was degraded to zero.
    pub degraded_recognition_samples: usize,
    /// Whether an audio track was present and analyzable.
    pub audio_available: bool,
    /// Whether the recognition model was loaded and used.
    pub recognition_available: bool,
    /// Number of frames the visual pass analyzed.
    pub frames_sampled: usize,
}

impl AnalysisReport {
    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} scenes detected, {:.1}s of audio peaks used, {} recognition samples degraded",
            self.scenes_detected, self.audio_peak_seconds, self.degraded_recognition_samples
        )
    }
}
