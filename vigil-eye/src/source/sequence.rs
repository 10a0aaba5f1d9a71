//! Directory of still images played back as a video

use super::FrameSource;
use crate::error::VisionError;
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Plays the images of a directory in file-name order.
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, VisionError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
                .unwrap_or(false);
            if path.is_file() && is_image {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(VisionError::Source(format!("no images found in {:?}", dir)));
        }

        files.sort();
        info!("Image sequence initialized: {:?} ({} frames)", dir, files.len());

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<Option<RgbImage>, VisionError> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let image = image::open(path)?;
        Ok(Some(image.to_rgb8()))
    }

    fn rewind(&mut self) -> Result<(), VisionError> {
        self.cursor = 0;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{:?}", self.dir)
    }
}
