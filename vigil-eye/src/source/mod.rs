//! Frame sources
//!
//! A [`FrameSource`] yields decoded RGB frames until it runs out;
//! [`LoopingSource`] turns any source into an endless one by rewinding at
//! end of stream.

pub mod memory;
pub mod sequence;
#[cfg(feature = "opencv")]
pub mod video;

pub use memory::MemorySource;
pub use sequence::ImageSequenceSource;
#[cfg(feature = "opencv")]
pub use video::VideoFileSource;

use crate::error::VisionError;
use image::RgbImage;
use std::path::Path;
use tracing::{debug, error, warn};

/// Decoded frame and its position within the current pass of the source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub index: u64,
}

/// Finite producer of decoded frames.
pub trait FrameSource: Send {
    /// Next frame, or `Ok(None)` at end of stream.
    fn read(&mut self) -> Result<Option<RgbImage>, VisionError>;

    /// Seek back to the first frame.
    fn rewind(&mut self) -> Result<(), VisionError>;

    /// Human-readable origin for log lines.
    fn describe(&self) -> String;
}

/// Endless wrapper that restarts the inner source at end of stream.
pub struct LoopingSource {
    inner: Box<dyn FrameSource>,
    index: u64,
    passes: u64,
}

impl LoopingSource {
    pub fn new(inner: Box<dyn FrameSource>) -> Self {
        Self {
            inner,
            index: 0,
            passes: 0,
        }
    }

    /// Next frame, rewinding once if the source is exhausted or fails.
    ///
    /// An error means two consecutive reads produced no frame; the stream
    /// should stop.
    pub fn next_frame(&mut self) -> Result<Frame, VisionError> {
        match self.inner.read() {
            Ok(Some(image)) => return Ok(self.emit(image)),
            Ok(None) => debug!("End of {}, looping", self.inner.describe()),
            Err(e) => warn!("Read from {} failed: {}, rewinding", self.inner.describe(), e),
        }

        if let Err(e) = self.inner.rewind() {
            error!("Cannot rewind {}: {}", self.inner.describe(), e);
            return Err(e);
        }
        self.index = 0;
        self.passes += 1;

        match self.inner.read() {
            Ok(Some(image)) => Ok(self.emit(image)),
            Ok(None) => {
                error!("No frame available from {} after rewind", self.inner.describe());
                Err(VisionError::Source(format!("{} produced no frames", self.inner.describe())))
            }
            Err(e) => {
                error!("Read from {} failed after rewind: {}", self.inner.describe(), e);
                Err(e)
            }
        }
    }

    /// Completed passes over the inner source.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn describe(&self) -> String {
        self.inner.describe()
    }

    fn emit(&mut self, image: RgbImage) -> Frame {
        let frame = Frame {
            image,
            index: self.index,
        };
        self.index += 1;
        frame
    }
}

/// Open the source behind a configured video path.
///
/// Directories are read as image sequences; anything else is decoded as a
/// video file, which requires the `opencv` feature.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>, VisionError> {
    if path.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(path)?));
    }

    #[cfg(feature = "opencv")]
    {
        Ok(Box::new(VideoFileSource::open(path)?))
    }

    #[cfg(not(feature = "opencv"))]
    {
        Err(VisionError::Config(format!(
            "cannot decode {:?}: video files need the opencv feature",
            path
        )))
    }
}
