//! Audio energy analysis over an FFmpeg PCM pipe.
//!
//! The track is decoded to mono f32 samples at a low rate and reduced
//! to one value per sampling interval: RMS energy plus a rectified
//! onset term (the positive first difference of energy). Loud moments
//! stand out, and sudden loudness jumps (impacts, crowd eruptions)
//! score higher than a sustained drone of the same level.

use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info};

use reel_models::SignalCurve;

use crate::error::{MediaError, MediaResult};

/// Configuration for audio energy analysis.
#[derive(Debug, Clone)]
pub struct AudioAnalyzerConfig {
    /// Decode sample rate in Hz. Energy needs no fidelity, so this is
    /// kept low to bound pipe throughput.
    pub sample_rate: u32,
    /// Seconds per energy window, matching the frame sampling grid.
    pub interval: f64,
}

impl Default for AudioAnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            interval: 0.5,
        }
    }
}

/// Result of an audio energy pass.
#[derive(Debug, Clone)]
pub struct AudioEnergy {
    /// Energy-plus-onset per interval, on the curve's own scale.
    pub curve: SignalCurve,
    /// Timestamp of the loudest window, if any window was measured.
    pub peak_t: Option<f64>,
}

/// Decode the audio track and measure RMS energy per interval.
///
/// Fails when the file has no decodable audio; callers that already
/// probed the container should substitute a zero curve instead of
/// calling this on a silent file.
pub async fn analyze_audio_energy(
    source: impl AsRef<Path>,
    config: &AudioAnalyzerConfig,
    cancel_rx: watch::Receiver<bool>,
) -> MediaResult<AudioEnergy> {
    let source = source.as_ref();
    if !source.exists() {
        return Err(MediaError::FileNotFound(source.to_path_buf()));
    }
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let sample_rate = config.sample_rate.to_string();
    let mut child = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(source)
        .args(["-vn", "-ac", "1", "-ar", &sample_rate, "-f", "f32le", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MediaError::internal("Failed to capture FFmpeg stdout"))?;
    let mut reader = BufReader::new(stdout);

    let window_samples = ((config.interval * config.sample_rate as f64) as usize).max(1);
    let mut window = vec![0u8; window_samples * 4];

    let mut curve = SignalCurve::new();
    let mut peak = (f64::MIN, None::<f64>);
    let mut prev_rms = None::<f64>;
    let mut index = 0u64;

    loop {
        if *cancel_rx.borrow() {
            let _ = child.kill().await;
            return Err(MediaError::Cancelled);
        }

        let read = read_window(&mut reader, &mut window).await?;
        if read == 0 {
            break;
        }

        let rms = rms_energy(&window[..read]);
        // Rectified first difference rewards sudden loudness jumps.
        // The first window has no predecessor and contributes none.
        let onset = prev_rms.map_or(0.0, |p: f64| (rms - p).max(0.0));
        let value = rms + onset;
        prev_rms = Some(rms);

        let t = index as f64 * config.interval;
        curve
            .push(t, value)
            .map_err(|e| MediaError::internal(format!("Audio curve out of order: {}", e)))?;
        if value > peak.0 {
            peak = (value, Some(t));
        }
        index += 1;

        // Short final window means the stream ended mid-interval.
        if read < window.len() {
            break;
        }
    }

    let mut stderr_buf = Vec::new();
    if let Some(mut stderr) = child.stderr.take() {
        stderr.read_to_end(&mut stderr_buf).await.ok();
    }
    let status = child.wait().await?;

    if !status.success() && curve.is_empty() {
        return Err(MediaError::ffmpeg_failed(
            "Audio track could not be decoded",
            Some(String::from_utf8_lossy(&stderr_buf).to_string()),
            status.code(),
        ));
    }

    info!(
        windows = curve.len(),
        peak_t = ?peak.1,
        "Audio energy analysis complete"
    );
    debug!(peak_value = peak.0, "Audio peak energy");

    Ok(AudioEnergy {
        curve,
        peak_t: peak.1,
    })
}

/// Fill `buf` from the pipe, returning the bytes read (truncated to a
/// whole number of f32 samples). 0 means end of stream.
async fn read_window(
    reader: &mut (impl AsyncReadExt + Unpin),
    buf: &mut [u8],
) -> MediaResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled - filled % 4)
}

/// Root mean square of little-endian f32 samples.
fn rms_energy(bytes: &[u8]) -> f64 {
    let mut sum_squares = 0.0f64;
    let mut count = 0usize;
    for chunk in bytes.chunks_exact(4) {
        let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if sample.is_finite() {
            sum_squares += (sample as f64) * (sample as f64);
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    (sum_squares / count as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples_to_bytes(samples: &[f32]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_rms_of_silence() {
        let bytes = samples_to_bytes(&[0.0; 64]);
        assert_eq!(rms_energy(&bytes), 0.0);
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let bytes = samples_to_bytes(&[0.5; 64]);
        assert!((rms_energy(&bytes) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rms_ignores_non_finite_samples() {
        let bytes = samples_to_bytes(&[0.5, f32::NAN, 0.5, f32::INFINITY]);
        assert!((rms_energy(&bytes) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rms_empty() {
        assert_eq!(rms_energy(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_tx, rx) = watch::channel(false);
        let result =
            analyze_audio_energy("/nonexistent/video.mp4", &AudioAnalyzerConfig::default(), rx)
                .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
