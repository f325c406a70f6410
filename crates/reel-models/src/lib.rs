//! Shared data models for the highlight reel engine.
//!
//! This crate provides Serde-serializable types for:
//! - The video timeline and time-indexed signal curves
//! - Segments and validated segment plans
//! - Highlight configuration (sampling, weights, selection windows)
//! - The read-only analysis report surfaced to callers

pub mod config;
pub mod curve;
pub mod report;
pub mod segment;
pub mod timeline;
pub mod timestamp;

// Re-export common types
pub use config::{HighlightConfig, SignalWeights, WeightError};
pub use curve::{CurveError, CurvePoint, SignalCurve};
pub use report::AnalysisReport;
pub use segment::{PlanError, ScoredSegment, Segment, SegmentPlan};
pub use timeline::{Timeline, TimelineError};
pub use timestamp::format_seconds;
