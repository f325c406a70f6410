//! The video timeline: the half-open interval `[0, T)` all signals
//! are indexed against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum reasonable video duration (24 hours in seconds).
pub const MAX_TIMELINE_SECS: f64 = 86400.0;

/// Error constructing a timeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    #[error("Timeline duration must be positive, got {0}")]
    NonPositiveDuration(f64),

    #[error("Timeline duration {0}s exceeds maximum ({MAX_TIMELINE_SECS}s)")]
    ExceedsMaxDuration(f64),
}

/// An immutable half-open interval `[0, T)` where `T` is the video
/// duration in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    duration: f64,
}

impl Timeline {
    /// Create a timeline for a video of `duration` seconds.
    ///
    /// Zero or negative durations are degenerate input and rejected;
    /// the pipeline surfaces this as a fatal error before any analysis.
    pub fn new(duration: f64) -> Result<Self, TimelineError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TimelineError::NonPositiveDuration(duration));
        }
        if duration > MAX_TIMELINE_SECS {
            return Err(TimelineError::ExceedsMaxDuration(duration));
        }
        Ok(Self { duration })
    }

    /// Total duration `T` in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Whether a timestamp falls inside `[0, T)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= 0.0 && t < self.duration
    }

    /// Clamp a timestamp into `[0, T)`.
    pub fn clamp(&self, t: f64) -> f64 {
        t.max(0.0).min(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_timeline() {
        let tl = Timeline::new(600.0).unwrap();
        assert!((tl.duration() - 600.0).abs() < f64::EPSILON);
        assert!(tl.contains(0.0));
        assert!(tl.contains(599.9));
        assert!(!tl.contains(600.0));
        assert!(!tl.contains(-1.0));
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(matches!(
            Timeline::new(0.0),
            Err(TimelineError::NonPositiveDuration(_))
        ));
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(matches!(
            Timeline::new(-5.0),
            Err(TimelineError::NonPositiveDuration(_))
        ));
    }

    #[test]
    fn test_nan_duration_rejected() {
        assert!(Timeline::new(f64::NAN).is_err());
    }

    #[test]
    fn test_excessive_duration_rejected() {
        assert!(matches!(
            Timeline::new(MAX_TIMELINE_SECS + 1.0),
            Err(TimelineError::ExceedsMaxDuration(_))
        ));
    }

    #[test]
    fn test_clamp() {
        let tl = Timeline::new(100.0).unwrap();
        assert_eq!(tl.clamp(-5.0), 0.0);
        assert_eq!(tl.clamp(50.0), 50.0);
        assert_eq!(tl.clamp(150.0), 100.0);
    }
}
