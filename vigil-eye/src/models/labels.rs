//! Class id to label mapping

use crate::error::VisionError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Names for a model's class ids.
#[derive(Debug, Clone, Default)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn coco() -> Self {
        Self::new(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// Sidecar file holding one label per line, next to the model.
    pub fn sidecar_path(model_path: &Path) -> PathBuf {
        model_path.with_extension("labels")
    }

    /// Parse a labels file, skipping blank lines.
    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Labels for a model: its sidecar file if present, COCO names for an
    /// 80-class model, otherwise none (ids are printed as `class_N`).
    pub fn for_model(model_path: &Path, num_classes: usize) -> Result<Self, VisionError> {
        let sidecar = Self::sidecar_path(model_path);
        if sidecar.exists() {
            let labels = Self::parse(&fs::read_to_string(&sidecar)?);
            info!("Loaded {} class labels from {:?}", labels.len(), sidecar);
            return Ok(labels);
        }

        if num_classes == COCO_CLASSES.len() {
            return Ok(Self::coco());
        }

        Ok(Self::default())
    }

    pub fn name(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
