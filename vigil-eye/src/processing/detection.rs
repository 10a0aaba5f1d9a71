//! Object detection pipeline

use crate::error::VisionError;
use crate::models::Detector;
use image::RgbImage;
use std::sync::Arc;
use tracing::debug;
use vigil_core::Detection;

/// Runs a shared detector and keeps only confident boxes.
#[derive(Clone)]
pub struct DetectionPipeline {
    detector: Arc<dyn Detector>,
    confidence_threshold: f32,
}

impl DetectionPipeline {
    /// Create a new detection pipeline
    pub fn new(detector: Arc<dyn Detector>, confidence_threshold: f32) -> Self {
        Self {
            detector,
            confidence_threshold,
        }
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Process frame and detect objects
    pub fn detect(&self, frame: &RgbImage) -> Result<Vec<Detection>, VisionError> {
        let mut detections = self.detector.detect(frame, self.confidence_threshold)?;
        // Detectors are asked to filter, but the threshold is enforced here.
        detections.retain(|d| d.confidence >= self.confidence_threshold);
        debug!("{} detected {} objects", self.detector.name(), detections.len());
        Ok(detections)
    }
}
