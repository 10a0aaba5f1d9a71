//! vigil-eye: video side of the surveillance service
//!
//! Frame sources that loop forever, detector backends, the overlay renderer,
//! JPEG/multipart encoding and the per-viewer processing loop that ties them
//! to the alert board.

pub mod error;
pub mod models;
pub mod processing;
pub mod processor;
pub mod source;

pub use error::VisionError;
pub use models::{load_detector, ClassLabels, Detector};
pub use processor::{ChannelProcessor, FrameLoop, SourceFactory, StreamSettings};
pub use source::{open_source, Frame, FrameSource, ImageSequenceSource, LoopingSource, MemorySource};
