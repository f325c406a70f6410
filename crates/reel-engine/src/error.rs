//! Pipeline-level error types.

use thiserror::Error;

use reel_models::{CurveError, PlanError, TimelineError, WeightError};

/// Result type for pipeline operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a highlight generation run.
///
/// Recoverable conditions (missing audio track, absent recognition
/// model, per-frame inference failures) never surface here; they
/// degrade the corresponding signal and are counted in the report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Video duration must be positive, got {0}")]
    InsufficientTimeline(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Media(#[from] reel_media::MediaError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Weights(#[from] WeightError),

    #[error("Signal curve construction failed: {0}")]
    Curve(#[from] CurveError),

    #[error("Segment plan construction failed: {0}")]
    Plan(#[from] PlanError),

    #[error("Analysis task panicked: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_converts() {
        let err: EngineError = reel_media::MediaError::FfmpegNotFound.into();
        assert!(matches!(err, EngineError::Media(_)));
    }

    #[test]
    fn test_display_insufficient_timeline() {
        let msg = EngineError::InsufficientTimeline(0.0).to_string();
        assert!(msg.contains("positive"));
    }
}
