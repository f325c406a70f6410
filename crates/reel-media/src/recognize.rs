//! Object and action recognition using a YOLOv8 ONNX model.
//!
//! Each sampled frame is run through the model and its detections are
//! folded into a single activity score: people and action-carrying
//! classes (sports gear, vehicles, animals) weigh more than static
//! scenery. The per-frame scores form the recognition signal curve.
//!
//! Execution provider selection is automatic: CUDA on Linux with the
//! `cuda` feature, CoreML on macOS, CPU everywhere else.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{DynamicImage, ImageBuffer, Rgb};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::sampler::Frame;

/// COCO class names (80 classes), in model output order.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

const NUM_CLASSES: usize = 80;
const NUM_BOXES: usize = 8400;
const NUM_FEATURES: usize = 84; // 4 bbox coords + 80 class scores

/// Configuration for the recognition model.
#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Path to the YOLOv8 ONNX model file.
    pub model_path: PathBuf,
    /// Minimum class confidence for a detection to count.
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression.
    pub nms_threshold: f32,
    /// Square model input size in pixels.
    pub input_size: u32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolov8n.onnx"),
            confidence_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// One detection in a frame, in normalized [0, 1] coordinates.
#[derive(Debug, Clone)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// COCO class ID (0 = person).
    pub class_id: usize,
    pub confidence: f32,
}

impl Detection {
    pub fn class_name(&self) -> &'static str {
        COCO_CLASSES.get(self.class_id).copied().unwrap_or("unknown")
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Recognition result for one frame.
#[derive(Debug, Clone)]
pub struct RecognizerOutput {
    /// Timestamp of the scored frame.
    pub t: f64,
    /// Detections surviving confidence filtering and NMS.
    pub detections: Vec<Detection>,
    /// Non-negative activity score aggregated over the detections.
    pub score: f64,
}

/// A loaded recognition model, shareable across analysis passes.
///
/// The session is behind a mutex: ONNX Runtime sessions need `&mut`
/// to run, and frames are scored one at a time anyway.
pub struct RecognitionModel {
    session: Mutex<Session>,
    config: RecognizerConfig,
}

impl RecognitionModel {
    /// Load the model from the configured path.
    ///
    /// A missing model file is reported so the caller can degrade to a
    /// zero recognition signal instead of aborting the run.
    pub fn load(config: RecognizerConfig) -> MediaResult<Self> {
        if !config.model_path.exists() {
            return Err(MediaError::model_not_found(
                config.model_path.to_string_lossy(),
            ));
        }

        let session = Mutex::new(create_session(&config.model_path)?);
        info!(
            model_path = %config.model_path.display(),
            input_size = config.input_size,
            "Recognition model loaded"
        );

        Ok(Self { session, config })
    }

    /// Score one frame.
    ///
    /// Failures here are per-sample: a malformed frame degrades one
    /// point on the curve, not the whole pass.
    pub fn recognize(&self, frame: &Frame) -> MediaResult<RecognizerOutput> {
        let img = frame_to_image(frame)?;
        let input = self.preprocess(&img)?;
        let raw = self.run_inference(input)?;
        let detections = self.postprocess(&raw)?;
        let score = activity_score(&detections);

        debug!(
            t = frame.t,
            detections = detections.len(),
            score = score,
            "Frame recognized"
        );

        Ok(RecognizerOutput {
            t: frame.t,
            detections,
            score,
        })
    }

    /// Resize to the model input, normalize to [0, 1], NCHW layout.
    fn preprocess(&self, img: &DynamicImage) -> MediaResult<Value> {
        let size = self.config.input_size;
        let resized = img.resize_exact(size, size, image::imageops::FilterType::Triangle);
        let rgb = resized.to_rgb8();
        let (w, h) = (size as usize, size as usize);

        let mut chw = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    chw.push(rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0);
                }
            }
        }

        Tensor::from_array((vec![1usize, 3, h, w], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::inference_failed(format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::inference_failed(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::inference_failed("Missing output0 tensor"))?;
        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference_failed(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Parse the [1, 84, 8400] YOLOv8 output and apply NMS.
    fn postprocess(&self, raw: &[f32]) -> MediaResult<Vec<Detection>> {
        if raw.len() != NUM_FEATURES * NUM_BOXES {
            return Err(MediaError::inference_failed(format!(
                "Unexpected output size: expected {}, got {}",
                NUM_FEATURES * NUM_BOXES,
                raw.len()
            )));
        }

        let output = Array::from_shape_vec((NUM_FEATURES, NUM_BOXES), raw.to_vec())
            .map_err(|e| MediaError::inference_failed(format!("Failed to reshape output: {}", e)))?;
        let boxes = output.t(); // [8400, 84]

        let input_size = self.config.input_size as f32;
        let mut candidates = Vec::new();

        for i in 0..NUM_BOXES {
            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for c in 0..NUM_CLASSES {
                let score = boxes[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < self.config.confidence_threshold {
                continue;
            }

            // Center-format bbox in model coordinates.
            let cx = boxes[[i, 0]] / input_size;
            let cy = boxes[[i, 1]] / input_size;
            let w = boxes[[i, 2]] / input_size;
            let h = boxes[[i, 3]] / input_size;

            let x = (cx - w / 2.0).clamp(0.0, 1.0);
            let y = (cy - h / 2.0).clamp(0.0, 1.0);
            candidates.push(Detection {
                x,
                y,
                width: w.min(1.0 - x),
                height: h.min(1.0 - y),
                class_id: best_class,
                confidence: best_score,
            });
        }

        Ok(non_maximum_suppression(candidates, self.config.nms_threshold))
    }
}

/// Weight of a class toward the activity score. Agents of action score
/// high; furniture barely registers.
fn class_weight(class_id: usize) -> f64 {
    match COCO_CLASSES.get(class_id).copied() {
        Some("person") => 1.0,
        // Sports gear and ridden things imply something is happening.
        Some(
            "sports ball" | "skateboard" | "surfboard" | "skis" | "snowboard" | "frisbee"
            | "tennis racket" | "baseball bat" | "baseball glove" | "kite",
        ) => 0.9,
        Some(
            "bicycle" | "car" | "motorcycle" | "airplane" | "bus" | "train" | "truck" | "boat",
        ) => 0.6,
        Some(
            "bird" | "cat" | "dog" | "horse" | "sheep" | "cow" | "elephant" | "bear" | "zebra"
            | "giraffe",
        ) => 0.6,
        Some(_) => 0.2,
        None => 0.0,
    }
}

/// Fold detections into one non-negative frame score.
fn activity_score(detections: &[Detection]) -> f64 {
    detections
        .iter()
        .map(|d| d.confidence as f64 * class_weight(d.class_id))
        .sum()
}

fn frame_to_image(frame: &Frame) -> MediaResult<DynamicImage> {
    let expected = (frame.width * frame.height * 3) as usize;
    if frame.data.len() != expected {
        return Err(MediaError::inference_failed(format!(
            "Invalid frame data length: expected {}, got {}",
            expected,
            frame.data.len()
        )));
    }
    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| MediaError::inference_failed("Failed to build image buffer"))?;
    Ok(DynamicImage::ImageRgb8(buffer))
}

/// Greedy NMS, same-class only, highest confidence kept.
fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        let overlaps = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && iou(kept, &candidate) > iou_threshold
        });
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create an ONNX Runtime session with automatic provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::internal(format!("Failed to read model file: {}", e)))?;

    let mut builder = Session::builder()
        .map_err(|e| MediaError::internal(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("Failed to set optimization level: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for recognition");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, falling back");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for recognition");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for recognition");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("Failed to load ONNX model: {}", e)))
}
