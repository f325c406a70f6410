//! Highlight reel engine.
//!
//! Orchestrates the analysis passes from `reel-media` into a complete
//! run: probe, sample, score, fuse, select, export. The library entry
//! point is [`generate_highlights`]; the `reelforge` binary wraps it
//! with environment configuration and signal handling.

pub mod config;
pub mod error;
pub mod fuse;
pub mod pipeline;
pub mod select;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use fuse::{fuse_signals, normalize, NormalizationMode};
pub use pipeline::{generate_highlights, HighlightOutcome};
pub use select::{score_windows, select_segments};
