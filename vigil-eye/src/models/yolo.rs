//! YOLO object detection model
//!
//! Output decoding and suppression are plain Rust so they can be exercised
//! without a runtime; the ONNX session itself sits behind the `onnx` feature.

use crate::models::labels::ClassLabels;
use vigil_core::{BoundingBox, Detection};

/// YOLO standard input size
pub const INPUT_SIZE: (u32, u32) = (640, 640);

/// IoU above which a lower-confidence box of the same class is dropped
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

const MAX_DETECTIONS: usize = 300;

/// Layout of a YOLOv8-style output tensor `[1, 4 + classes, anchors]`,
/// or its transpose `[1, anchors, 4 + classes]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    pub num_classes: usize,
    pub num_anchors: usize,
    pub transposed: bool,
}

impl OutputLayout {
    /// Infer the layout from a tensor shape.
    pub fn from_shape(shape: &[i64]) -> Option<Self> {
        if shape.len() != 3 || shape[0] != 1 {
            return None;
        }
        let (a, b) = (usize::try_from(shape[1]).ok()?, usize::try_from(shape[2]).ok()?);
        // Anchors always outnumber attributes.
        let (attributes, anchors, transposed) = if a <= b { (a, b, false) } else { (b, a, true) };
        if attributes <= 4 || anchors == 0 {
            return None;
        }
        Some(Self {
            num_classes: attributes - 4,
            num_anchors: anchors,
            transposed,
        })
    }

    fn value(&self, data: &[f32], attribute: usize, anchor: usize) -> f32 {
        let index = if self.transposed {
            anchor * (self.num_classes + 4) + attribute
        } else {
            attribute * self.num_anchors + anchor
        };
        data.get(index).copied().unwrap_or(0.0)
    }
}

/// Turn raw output values into detections in frame coordinates.
///
/// Boxes are `(cx, cy, w, h)` in model input pixels and are scaled back to
/// the `frame_size` the input was resized from.
pub fn decode_output(
    data: &[f32],
    layout: OutputLayout,
    frame_size: (u32, u32),
    confidence_threshold: f32,
    labels: &ClassLabels,
) -> Vec<Detection> {
    let scale_x = frame_size.0 as f32 / INPUT_SIZE.0 as f32;
    let scale_y = frame_size.1 as f32 / INPUT_SIZE.1 as f32;
    let (frame_w, frame_h) = (frame_size.0 as f32, frame_size.1 as f32);

    let mut detections = Vec::new();
    for anchor in 0..layout.num_anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for class_id in 0..layout.num_classes {
            let score = layout.value(data, 4 + class_id, anchor);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if !best_score.is_finite() || best_score < confidence_threshold {
            continue;
        }

        let cx = layout.value(data, 0, anchor);
        let cy = layout.value(data, 1, anchor);
        let w = layout.value(data, 2, anchor);
        let h = layout.value(data, 3, anchor);
        if ![cx, cy, w, h].iter().all(|v| v.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let x = ((cx - w / 2.0) * scale_x).clamp(0.0, frame_w);
        let y = ((cy - h / 2.0) * scale_y).clamp(0.0, frame_h);
        let width = (w * scale_x).min(frame_w - x);
        let height = (h * scale_y).min(frame_h - y);
        if width <= 0.0 || height <= 0.0 {
            continue;
        }

        detections.push(Detection::new(
            best_class,
            labels.name(best_class),
            best_score.min(1.0),
            BoundingBox::new(x, y, width, height),
        ));
    }

    apply_nms(detections, NMS_IOU_THRESHOLD)
}

/// Class-wise non-maximum suppression, highest confidence first.
pub fn apply_nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.retain(|d| d.confidence.is_finite());
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        let suppressed = keep
            .iter()
            .any(|kept| kept.class_id == candidate.class_id && kept.bbox.iou(&candidate.bbox) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
            if keep.len() == MAX_DETECTIONS {
                break;
            }
        }
    }
    keep
}

/// Resize to the model input and lay out as normalised CHW floats.
pub fn to_chw_tensor(frame: &image::RgbImage) -> Vec<f32> {
    let resized = image::imageops::resize(
        frame,
        INPUT_SIZE.0,
        INPUT_SIZE.1,
        image::imageops::FilterType::Triangle,
    );
    let (w, h) = (INPUT_SIZE.0 as usize, INPUT_SIZE.1 as usize);
    let plane = w * h;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = y as usize * w + x as usize;
        for c in 0..3 {
            data[c * plane + offset] = pixel[c] as f32 / 255.0;
        }
    }
    data
}

#[cfg(feature = "onnx")]
pub use runtime::YoloDetector;

#[cfg(feature = "onnx")]
mod runtime {
    use super::*;
    use crate::error::VisionError;
    use crate::models::Detector;
    use image::RgbImage;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use std::path::Path;
    use tracing::{debug, info};

    /// YOLOv8 model exported to ONNX
    pub struct YoloDetector {
        name: String,
        session: Mutex<Session>,
        labels: ClassLabels,
    }

    impl YoloDetector {
        /// Create a new YOLO model
        pub fn new(model_path: &Path) -> Result<Self, VisionError> {
            let session = Session::builder()?
                .commit_from_file(model_path)
                .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model {:?}: {}", model_path, e)))?;

            let num_classes = session
                .outputs
                .first()
                .and_then(|output| output.output_type.tensor_shape())
                .and_then(|shape| OutputLayout::from_shape(shape))
                .map(|layout| layout.num_classes)
                .unwrap_or(0);
            let labels = ClassLabels::for_model(model_path, num_classes)?;

            info!("YOLO model loaded from {:?} ({} classes)", model_path, num_classes);

            Ok(Self {
                name: model_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("yolo")
                    .to_string(),
                session: Mutex::new(session),
                labels,
            })
        }
    }

    impl Detector for YoloDetector {
        fn detect(&self, frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>, VisionError> {
            let input = Tensor::from_array((
                [1usize, 3, INPUT_SIZE.1 as usize, INPUT_SIZE.0 as usize],
                to_chw_tensor(frame),
            ))?;

            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![input])?;
            let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

            let layout = OutputLayout::from_shape(shape)
                .ok_or_else(|| VisionError::Model(format!("Unexpected YOLO output shape: {:?}", shape)))?;

            let detections = decode_output(data, layout, frame.dimensions(), confidence_threshold, &self.labels);
            debug!("YOLO detected {} objects", detections.len());
            Ok(detections)
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}
