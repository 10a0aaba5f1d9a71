//! In-memory frame source

use super::FrameSource;
use crate::error::VisionError;
use image::RgbImage;

/// Serves a fixed list of frames, optionally failing the first reads.
pub struct MemorySource {
    frames: Vec<RgbImage>,
    cursor: usize,
    failures_left: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames,
            cursor: 0,
            failures_left: 0,
        }
    }

    /// Make the next `count` reads fail with a source error.
    pub fn failing_reads(mut self, count: usize) -> Self {
        self.failures_left = count;
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for MemorySource {
    fn read(&mut self) -> Result<Option<RgbImage>, VisionError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(VisionError::Source("simulated decode failure".to_string()));
        }

        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn rewind(&mut self) -> Result<(), VisionError> {
        self.cursor = 0;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory source ({} frames)", self.frames.len())
    }
}
