//! Detector output types

use serde::{Deserialize, Serialize};

/// Axis-aligned box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Whether a point lies inside the box (edges included).
    pub fn contains(&self, (px, py): (f32, f32)) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    /// Intersection over union, 0.0 for disjoint or degenerate boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let values = [
            self.x, self.y, self.width, self.height,
            other.x, other.y, other.width, other.height,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return 0.0;
        }

        let inter_x_min = self.x.max(other.x);
        let inter_y_min = self.y.max(other.y);
        let inter_x_max = (self.x + self.width).min(other.x + other.width);
        let inter_y_max = (self.y + self.height).min(other.y + other.height);

        if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
            return 0.0;
        }

        let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0.0 {
            return 0.0;
        }

        (inter_area / union_area).clamp(0.0, 1.0)
    }
}

/// One labelled box produced by a detector for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: usize, label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            label: label.into(),
            confidence,
            bbox,
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label.eq_ignore_ascii_case(label)
    }
}
