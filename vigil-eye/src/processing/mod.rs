//! Per-frame processing stages

pub mod detection;
pub mod encode;
pub mod render;

pub use detection::DetectionPipeline;
pub use encode::{encode_jpeg, multipart_part, BOUNDARY};
pub use render::render_detections;
