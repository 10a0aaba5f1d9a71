//! Object detectors

pub mod labels;
pub mod yolo;

pub use labels::ClassLabels;
#[cfg(feature = "onnx")]
pub use yolo::YoloDetector;

use crate::error::VisionError;
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use vigil_core::Detection;

/// Opaque detection capability: labelled boxes with confidences.
///
/// Implementations are shared between concurrent streams of a channel and
/// serialise inference internally when their runtime needs it.
pub trait Detector: Send + Sync {
    /// Detect objects in `frame`, keeping boxes at or above the threshold.
    fn detect(&self, frame: &RgbImage, confidence_threshold: f32) -> Result<Vec<Detection>, VisionError>;

    /// Short name for log lines.
    fn name(&self) -> &str;
}

/// Load the detector for a model artifact.
pub fn load_detector(model_path: &Path) -> Result<Arc<dyn Detector>, VisionError> {
    #[cfg(feature = "onnx")]
    {
        Ok(Arc::new(YoloDetector::new(model_path)?))
    }

    #[cfg(not(feature = "onnx"))]
    {
        Err(VisionError::Config(format!(
            "cannot load {:?}: model inference needs the onnx feature",
            model_path
        )))
    }
}
