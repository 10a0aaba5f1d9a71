//! Video file decoding through OpenCV

use super::FrameSource;
use crate::error::VisionError;
use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_COUNT, CAP_PROP_POS_FRAMES},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Decodes a video file frame by frame.
pub struct VideoFileSource {
    path: PathBuf,
    capture: VideoCapture,
    total_frames: i64,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, VisionError> {
        let capture = Self::open_capture(path)?;
        let total_frames = capture.get(CAP_PROP_FRAME_COUNT).unwrap_or(0.0) as i64;
        info!("Video initialized: {:?} ({} frames)", path, total_frames);

        Ok(Self {
            path: path.to_path_buf(),
            capture,
            total_frames,
        })
    }

    pub fn total_frames(&self) -> i64 {
        self.total_frames
    }

    fn open_capture(path: &Path) -> Result<VideoCapture, VisionError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| VisionError::Source(format!("video path is not valid UTF-8: {:?}", path)))?;

        let capture = VideoCapture::from_file(path_str, CAP_ANY)
            .map_err(|e| VisionError::Source(format!("Failed to open video {:?}: {}", path, e)))?;

        if !capture.is_opened()? {
            return Err(VisionError::Source(format!("Cannot open video file: {:?}", path)));
        }

        Ok(capture)
    }
}

impl FrameSource for VideoFileSource {
    fn read(&mut self) -> Result<Option<RgbImage>, VisionError> {
        let mut frame = Mat::default();
        let grabbed = self
            .capture
            .read(&mut frame)
            .map_err(|e| VisionError::Source(format!("Failed to read frame: {}", e)))?;

        if !grabbed || frame.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let (width, height) = (rgb.cols(), rgb.rows());
        if width <= 0 || height <= 0 {
            return Err(VisionError::Source("Decoded frame has no pixels".to_string()));
        }

        let data = rgb.data_bytes()?.to_vec();
        let image = RgbImage::from_raw(width as u32, height as u32, data)
            .ok_or_else(|| VisionError::Source("Decoded frame buffer has unexpected size".to_string()))?;

        Ok(Some(image))
    }

    fn rewind(&mut self) -> Result<(), VisionError> {
        match self.capture.set(CAP_PROP_POS_FRAMES, 0.0) {
            Ok(true) => Ok(()),
            Ok(false) | Err(_) => {
                warn!("Seek not supported for {:?}, reopening", self.path);
                self.capture = Self::open_capture(&self.path)?;
                Ok(())
            }
        }
    }

    fn describe(&self) -> String {
        format!("{:?}", self.path)
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}
