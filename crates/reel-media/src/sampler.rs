//! Frame sampling over an FFmpeg rawvideo pipe.
//!
//! The sampler spawns one decode session that emits small RGB24
//! thumbnails at a fixed interval. Decoding is sequential and stateful,
//! so a [`FrameStream`] is consumed exactly once; a second analysis
//! pass takes a second sampler (a distinct decode session).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Configuration for frame sampling.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Seconds between sampled frames.
    pub interval: f64,
    /// Thumbnail width in pixels.
    pub width: u32,
    /// Thumbnail height in pixels.
    pub height: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        // Small thumbnails: histograms and coarse recognition do not
        // need full resolution.
        Self {
            interval: 0.5,
            width: 160,
            height: 90,
        }
    }
}

impl SamplerConfig {
    /// Config sized for recognition-model input (larger thumbnails).
    pub fn for_recognition(interval: f64) -> Self {
        Self {
            interval,
            width: 640,
            height: 360,
        }
    }
}

/// One sampled frame: a timestamp with transiently owned RGB24 pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Timestamp in seconds from the start of the video.
    pub t: f64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Raw RGB24 bytes, `width * height * 3` long.
    pub data: Vec<u8>,
}

/// Frame sampler: starts decode sessions for a source video.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    source: PathBuf,
    config: SamplerConfig,
}

impl FrameSampler {
    /// Create a sampler for a source video.
    pub fn new(source: impl AsRef<Path>, config: SamplerConfig) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            config,
        }
    }

    /// The configured sampling interval in seconds.
    pub fn interval(&self) -> f64 {
        self.config.interval
    }

    /// Start a decode session and return the one-shot frame stream.
    ///
    /// Fails with a decode error when the source cannot be opened;
    /// stream-level corruption surfaces from `next_frame`.
    pub fn start(&self, cancel_rx: watch::Receiver<bool>) -> MediaResult<FrameStream> {
        if !self.source.exists() {
            return Err(MediaError::FileNotFound(self.source.clone()));
        }
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let fps = 1.0 / self.config.interval;
        let filter = format!(
            "fps={:.6},scale={}:{}",
            fps, self.config.width, self.config.height
        );

        let mut child = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(&self.source)
            .args([
                "-vf",
                &filter,
                "-pix_fmt",
                "rgb24",
                "-f",
                "rawvideo",
                "-an",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::decode_failed(format!("Failed to spawn FFmpeg: {}", e), None))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::decode_failed("Failed to capture FFmpeg stdout", None))?;

        debug!(
            source = %self.source.display(),
            interval = self.config.interval,
            width = self.config.width,
            height = self.config.height,
            "Frame sampling session started"
        );

        Ok(FrameStream {
            child,
            stdout: BufReader::new(stdout),
            cancel_rx,
            interval: self.config.interval,
            width: self.config.width,
            height: self.config.height,
            next_index: 0,
        })
    }
}

/// A one-shot stream of sampled frames from a single decode session.
///
/// Dropping the stream kills the underlying FFmpeg process, so an
/// abandoned pass releases its decoder deterministically.
pub struct FrameStream {
    child: Child,
    stdout: BufReader<ChildStdout>,
    cancel_rx: watch::Receiver<bool>,
    interval: f64,
    width: u32,
    height: u32,
    next_index: u64,
}

impl FrameStream {
    /// Bytes per RGB24 frame.
    fn bytes_per_frame(&self) -> usize {
        (self.width * self.height * 3) as usize
    }

    /// Number of frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.next_index
    }

    /// Read the next frame, or `None` at end of stream.
    ///
    /// Checks the cancellation signal between frames; once cancelled,
    /// the decoder is killed and `Cancelled` is returned.
    pub async fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        if *self.cancel_rx.borrow() {
            let _ = self.child.kill().await;
            return Err(MediaError::Cancelled);
        }

        let mut data = vec![0u8; self.bytes_per_frame()];
        match self.stdout.read_exact(&mut data).await {
            Ok(_) => {
                let t = self.next_index as f64 * self.interval;
                self.next_index += 1;
                Ok(Some(Frame {
                    t,
                    width: self.width,
                    height: self.height,
                    data,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finish().await?;
                Ok(None)
            }
            Err(e) => Err(MediaError::decode_failed(
                format!("Failed to read frame data: {}", e),
                None,
            )),
        }
    }

    /// Reap the decoder and map a failed session with no output to a
    /// decode error (corrupt file, unsupported codec).
    async fn finish(&mut self) -> MediaResult<()> {
        let mut stderr_buf = Vec::new();
        if let Some(mut stderr) = self.child.stderr.take() {
            stderr.read_to_end(&mut stderr_buf).await.ok();
        }
        let status = self.child.wait().await?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_buf).to_string();
            if self.next_index == 0 {
                return Err(MediaError::decode_failed(
                    "Video stream could not be decoded",
                    Some(stderr),
                ));
            }
            // Partial decode: frames already emitted are usable.
            warn!(
                frames = self.next_index,
                exit_code = ?status.code(),
                "FFmpeg exited non-zero after partial decode"
            );
        }
        Ok(())
    }
}
