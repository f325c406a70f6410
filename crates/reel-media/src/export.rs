//! Export adapter: cut selected segments and concatenate the reel.
//!
//! Each segment is extracted with stream copy (no re-encode) into a
//! temporary part file, then the parts are joined with the FFmpeg
//! concat demuxer. A single-segment plan skips the concat step.

use metrics::counter;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{info, instrument};

use reel_models::{Segment, SegmentPlan};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Configuration for reel export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Per-FFmpeg-invocation timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { timeout_secs: 600 }
    }
}

/// Default output file name for a source, stamped with the current
/// time so repeated runs never clobber each other.
pub fn timestamped_output_name(source: impl AsRef<Path>) -> String {
    let stem = source
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    format!(
        "{}_highlights_{}.mp4",
        stem,
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    )
}

/// Cut every segment of `plan` from `source` and write the joined
/// reel to `output`. Segments are emitted in plan order, which the
/// planner guarantees is chronological.
#[instrument(skip(plan, config, cancel_rx), fields(segments = plan.segments().len()))]
pub async fn export_highlights(
    source: &Path,
    plan: &SegmentPlan,
    output: &Path,
    config: &ExportConfig,
    cancel_rx: watch::Receiver<bool>,
) -> MediaResult<()> {
    if !source.exists() {
        return Err(MediaError::FileNotFound(source.to_path_buf()));
    }
    let segments = plan.segments();
    if segments.is_empty() {
        return Err(MediaError::internal("Cannot export an empty segment plan"));
    }

    let runner = FfmpegRunner::new()
        .with_cancel(cancel_rx)
        .with_timeout(config.timeout_secs);

    if let [only] = segments {
        cut_segment(&runner, source, only, output).await?;
        info!(output = %output.display(), "Exported single-segment reel");
        return Ok(());
    }

    let work_dir = tempfile::tempdir()?;
    let mut part_paths = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let part = work_dir.path().join(format!("part_{:04}.mp4", i));
        cut_segment(&runner, source, segment, &part).await?;
        counter!("reel_segments_exported_total").increment(1);
        part_paths.push(part);
    }

    let list_path = work_dir.path().join("concat.txt");
    tokio::fs::write(&list_path, concat_list(&part_paths)).await?;

    let concat = FfmpegCommand::new(&list_path, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .codec_copy();
    runner.run(&concat).await?;

    info!(
        output = %output.display(),
        parts = part_paths.len(),
        total_duration = plan.total_duration(),
        "Exported highlight reel"
    );
    Ok(())
}

/// Stream-copy one segment out of the source.
async fn cut_segment(
    runner: &FfmpegRunner,
    source: &Path,
    segment: &Segment,
    output: &Path,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(source, output)
        .seek(segment.start)
        .duration(segment.duration())
        .codec_copy()
        // Keyframe-aligned copy can leave streams slightly offset.
        .output_arg("-avoid_negative_ts")
        .output_arg("make_zero");
    runner.run(&cmd).await
}

/// Concat demuxer list file contents. Single quotes in paths are
/// escaped per the demuxer's quoting rules.
fn concat_list(parts: &[PathBuf]) -> String {
    let mut list = String::new();
    for part in parts {
        let escaped = part.to_string_lossy().replace('\'', "'\\''");
        list.push_str(&format!("file '{}'\n", escaped));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamped_output_name() {
        let name = timestamped_output_name("/videos/match_final.mp4");
        assert!(name.starts_with("match_final_highlights_"));
        assert!(name.ends_with(".mp4"));
    }

    #[test]
    fn test_timestamped_output_name_no_stem() {
        let name = timestamped_output_name("/");
        assert!(name.starts_with("video_highlights_"));
    }

    #[test]
    fn test_concat_list_format() {
        let parts = vec![PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/b.mp4")];
        let list = concat_list(&parts);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/b.mp4'\n");
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let parts = vec![PathBuf::from("/tmp/it's.mp4")];
        assert!(concat_list(&parts).contains("'\\''"));
    }

    #[tokio::test]
    async fn test_export_empty_plan_rejected() {
        // The source must exist so the empty-plan check is what fails.
        let source = tempfile::NamedTempFile::new().unwrap();
        let plan = SegmentPlan::new(Vec::new()).unwrap();
        let (_tx, rx) = watch::channel(false);
        let result = export_highlights(
            source.path(),
            &plan,
            Path::new("/tmp/out.mp4"),
            &ExportConfig::default(),
            rx,
        )
        .await;
        assert!(matches!(result, Err(MediaError::Internal(_))));
    }

    #[tokio::test]
    async fn test_export_missing_source_rejected() {
        let plan = SegmentPlan::whole_video(5.0).unwrap();
        let (_tx, rx) = watch::channel(false);
        let result = export_highlights(
            Path::new("/nonexistent.mp4"),
            &plan,
            Path::new("/tmp/out.mp4"),
            &ExportConfig::default(),
            rx,
        )
        .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
