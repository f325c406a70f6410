//! The highlight generation pipeline.
//!
//! One run probes the input, fans out three independent analysis
//! passes (each with its own decode session), fuses their curves,
//! selects segments, and exports the reel. Analyzer degradations are
//! recoverable: a silent file or a missing recognition model zeroes
//! that signal and is counted in the report, while decode failures and
//! missing binaries abort the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use reel_media::{
    analyze_audio_energy, check_ffmpeg, check_ffprobe, export_highlights, probe_video,
    timestamped_output_name, AudioAnalyzerConfig, ExportConfig, FrameSampler, MediaError,
    RecognitionModel, RecognizerConfig, SamplerConfig, SceneChangeConfig, SceneChangeDetector,
};
use reel_models::{format_seconds, AnalysisReport, SegmentPlan, SignalCurve, Timeline};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fuse::{fuse_signals, NormalizationMode};
use crate::select::select_segments;

/// Result of one completed run. Serializable so callers can persist
/// or display the plan and curve as plain numeric records.
#[derive(Debug, Clone, Serialize)]
pub struct HighlightOutcome {
    /// The selected segments, in playback order.
    pub plan: SegmentPlan,
    /// The fused saliency curve, for display alongside the plan.
    pub saliency: SignalCurve,
    /// Analysis statistics for display.
    pub report: AnalysisReport,
    /// Where the exported reel was written.
    pub output: PathBuf,
}

/// Generate a highlight reel for `input`, writing to `output` (or a
/// timestamped name next to the input when `None`).
#[instrument(skip(config, cancel_rx), fields(input = %input.display()))]
pub async fn generate_highlights(
    input: &Path,
    output: Option<PathBuf>,
    config: &EngineConfig,
    cancel_rx: watch::Receiver<bool>,
) -> EngineResult<HighlightOutcome> {
    config.validate()?;
    check_ffmpeg()?;
    check_ffprobe()?;
    counter!("reel_runs_started_total").increment(1);

    let info = probe_video(input).await?;
    if info.duration <= 0.0 {
        return Err(EngineError::InsufficientTimeline(info.duration));
    }
    let timeline = Timeline::new(info.duration)?;
    info!(
        duration = %format_seconds(info.duration),
        resolution = %format!("{}x{}", info.width, info.height),
        fps = info.fps,
        has_audio = info.has_audio,
        "Probed input video"
    );

    let step = config.highlight.sampling_interval;
    let grid_len = (timeline.duration() / step).ceil() as usize;

    // A video no longer than the target needs no analysis at all.
    if timeline.duration() <= config.highlight.target_duration {
        info!(
            duration = %format_seconds(timeline.duration()),
            target = config.highlight.target_duration,
            "Input fits within the target, exporting whole video"
        );
        let plan = SegmentPlan::whole_video(timeline.duration())?;
        let report = AnalysisReport {
            audio_available: info.has_audio,
            recognition_available: config.model_path.exists(),
            ..AnalysisReport::default()
        };
        let output = resolve_output(input, output);
        export_highlights(
            input,
            &plan,
            &output,
            &ExportConfig {
                timeout_secs: config.export_timeout_secs,
            },
            cancel_rx,
        )
        .await?;
        counter!("reel_runs_completed_total").increment(1);
        return Ok(HighlightOutcome {
            plan,
            saliency: SignalCurve::zeros(step, grid_len),
            report,
            output,
        });
    }

    let visual_task = tokio::spawn(visual_pass(
        input.to_path_buf(),
        step,
        cancel_rx.clone(),
    ));
    let audio_task = tokio::spawn(audio_pass(
        input.to_path_buf(),
        info.has_audio,
        AudioAnalyzerConfig {
            sample_rate: config.audio_sample_rate,
            interval: step,
        },
        cancel_rx.clone(),
    ));
    let recognition_task = tokio::spawn(recognition_pass(
        input.to_path_buf(),
        config.model_path.clone(),
        config.recognition_interval,
        cancel_rx.clone(),
    ));

    let (visual, audio, recognition) =
        tokio::join!(visual_task, audio_task, recognition_task);
    let (visual_curve, scenes_detected, frames_sampled) = visual??;
    let audio_result = audio??;
    let recognition_result = recognition??;

    let audio_available = audio_result.is_some();
    let (audio_curve, audio_peak_t) = match audio_result {
        Some(energy) => (energy.curve, energy.peak_t),
        None => {
            counter!("reel_audio_unavailable_total").increment(1);
            (SignalCurve::zeros(step, grid_len), None)
        }
    };
    let recognition_available = recognition_result.is_some();
    let (recognition_curve, degraded_recognition_samples) = match recognition_result {
        Some((curve, degraded)) => (curve, degraded),
        None => {
            counter!("reel_recognition_unavailable_total").increment(1);
            (SignalCurve::zeros(step, grid_len), 0)
        }
    };

    let mode = if config.zscore_normalization {
        NormalizationMode::ClippedZScore
    } else {
        NormalizationMode::MinMax
    };
    let fused = fuse_signals(
        &visual_curve,
        &audio_curve,
        &recognition_curve,
        config.highlight.weights,
        mode,
        step,
        timeline.duration(),
    )?;

    let plan = select_segments(
        &fused,
        &timeline,
        config.highlight.target_duration,
        config.highlight.window_granularity,
    )?;

    let report = AnalysisReport {
        scenes_detected: scenes_detected as usize,
        audio_peak_seconds: audio_peak_seconds(&plan, &audio_curve, step),
        degraded_recognition_samples,
        audio_available,
        recognition_available,
        frames_sampled,
    };
    info!(
        segments = plan.len(),
        total = %format_seconds(plan.total_duration()),
        peak_t = ?audio_peak_t,
        "{}", report.summary()
    );

    let output = resolve_output(input, output);
    export_highlights(
        input,
        &plan,
        &output,
        &ExportConfig {
            timeout_secs: config.export_timeout_secs,
        },
        cancel_rx,
    )
    .await?;

    counter!("reel_runs_completed_total").increment(1);
    Ok(HighlightOutcome {
        plan,
        saliency: fused,
        report,
        output,
    })
}

/// Sample frames and build the visual-change curve.
async fn visual_pass(
    input: PathBuf,
    interval: f64,
    cancel_rx: watch::Receiver<bool>,
) -> EngineResult<(SignalCurve, u32, usize)> {
    let sampler = FrameSampler::new(
        &input,
        SamplerConfig {
            interval,
            ..SamplerConfig::default()
        },
    );
    let mut stream = sampler.start(cancel_rx)?;
    let mut detector = SceneChangeDetector::new(SceneChangeConfig::default());

    let mut frames = 0usize;
    while let Some(frame) = stream.next_frame().await? {
        detector.observe(&frame)?;
        frames += 1;
    }

    let cuts = detector.cuts_detected();
    info!(frames = frames, cuts = cuts, "Visual pass complete");
    Ok((detector.into_curve(), cuts, frames))
}

/// Measure audio energy, or report the signal unavailable.
async fn audio_pass(
    input: PathBuf,
    has_audio: bool,
    config: AudioAnalyzerConfig,
    cancel_rx: watch::Receiver<bool>,
) -> EngineResult<Option<reel_media::AudioEnergy>> {
    if !has_audio {
        warn!("Input has no audio track, audio signal degraded to zero");
        return Ok(None);
    }
    match analyze_audio_energy(&input, &config, cancel_rx).await {
        Ok(energy) => Ok(Some(energy)),
        Err(MediaError::Cancelled) => Err(MediaError::Cancelled.into()),
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            // Probe saw an audio stream but it would not decode.
            warn!(error = %e, "Audio analysis failed, signal degraded to zero");
            Ok(None)
        }
    }
}

/// Run recognition over a coarser frame grid, or report the signal
/// unavailable when the model is missing.
async fn recognition_pass(
    input: PathBuf,
    model_path: PathBuf,
    interval: f64,
    cancel_rx: watch::Receiver<bool>,
) -> EngineResult<Option<(SignalCurve, usize)>> {
    // Session construction parses the whole model file; run it on the
    // blocking pool to avoid stalling the async runtime.
    let loaded = tokio::task::spawn_blocking(move || {
        RecognitionModel::load(RecognizerConfig {
            model_path,
            ..RecognizerConfig::default()
        })
    })
    .await?;
    let model = match loaded {
        Ok(model) => Arc::new(model),
        Err(MediaError::ModelNotFound(path)) => {
            warn!(
                model_path = %path,
                "Recognition model not found, signal degraded to zero"
            );
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let sampler = FrameSampler::new(&input, SamplerConfig::for_recognition(interval));
    let mut stream = sampler.start(cancel_rx)?;

    let mut curve = SignalCurve::new();
    let mut degraded = 0usize;
    while let Some(frame) = stream.next_frame().await? {
        let t = frame.t;
        // Inference is CPU-bound for tens of milliseconds per frame;
        // it must not hold a runtime worker thread.
        let worker = Arc::clone(&model);
        let scored = tokio::task::spawn_blocking(move || worker.recognize(&frame)).await?;
        let score = match scored {
            Ok(output) => output.score,
            Err(e) if !e.is_fatal() => {
                warn!(t = t, error = %e, "Recognition failed for frame");
                counter!("reel_recognition_degraded_total").increment(1);
                degraded += 1;
                0.0
            }
            Err(e) => return Err(e.into()),
        };
        curve.push(t, score)?;
    }

    info!(
        samples = curve.len(),
        degraded = degraded,
        "Recognition pass complete"
    );
    Ok(Some((curve, degraded)))
}

/// Seconds of plan time sitting on an audio peak (within 80% of the
/// loudest measured window).
fn audio_peak_seconds(plan: &SegmentPlan, audio: &SignalCurve, interval: f64) -> f64 {
    let threshold = 0.8 * audio.max_value();
    if threshold <= 0.0 {
        return 0.0;
    }
    audio
        .points()
        .iter()
        .filter(|p| p.value >= threshold)
        .filter(|p| {
            plan.segments()
                .iter()
                .any(|s| p.t >= s.start && p.t < s.end)
        })
        .count() as f64
        * interval
}

fn resolve_output(input: &Path, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| default_output_path(input))
}

/// Timestamped output path in the input's directory.
fn default_output_path(input: &Path) -> PathBuf {
    let name = timestamped_output_name(input);
    match input.parent() {
        Some(dir) if dir.as_os_str().is_empty() => PathBuf::from(name),
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}
