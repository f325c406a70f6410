#![deny(unreachable_patterns)]
//! FFmpeg plumbing and signal analyzers for highlight generation.
//!
//! This crate provides:
//! - Type-safe FFmpeg/FFprobe command building and execution
//! - Frame sampling over a rawvideo pipe with cancellation support
//! - The three per-modality analyzers: scene change, audio energy,
//!   object/action recognition
//! - The export adapter that cuts and concatenates the final reel

pub mod audio;
pub mod command;
pub mod error;
pub mod export;
pub mod probe;
pub mod recognize;
pub mod sampler;
pub mod scene;

pub use audio::{analyze_audio_energy, AudioAnalyzerConfig, AudioEnergy};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use export::{export_highlights, timestamped_output_name, ExportConfig};
pub use probe::{probe_video, VideoInfo};
pub use recognize::{Detection, RecognitionModel, RecognizerConfig, RecognizerOutput};
pub use sampler::{Frame, FrameSampler, FrameStream, SamplerConfig};
pub use scene::{SceneChangeConfig, SceneChangeDetector};
