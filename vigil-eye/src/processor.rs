//! Per-channel frame processing
//!
//! A [`ChannelProcessor`] holds what a channel shares between viewers: the
//! detector, the qualification policy and the alert board. Each viewer gets
//! its own [`FrameLoop`] with an independent decode handle.

use crate::error::VisionError;
use crate::models::{load_detector, Detector};
use crate::processing::{encode_jpeg, multipart_part, render_detections, DetectionPipeline};
use crate::source::{open_source, FrameSource, LoopingSource};
use bytes::Bytes;
use image::RgbImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use vigil_core::{AlertBoard, AlertPolicy, Channel, ChannelConfig, DetectionConfig};

/// Opens a fresh frame source for one viewer.
pub type SourceFactory = Arc<dyn Fn() -> Result<Box<dyn FrameSource>, VisionError> + Send + Sync>;

/// Streaming parameters applied to every frame of a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSettings {
    pub confidence_threshold: f32,
    pub jpeg_quality: u8,
    pub frame_interval: Duration,
}

impl From<&DetectionConfig> for StreamSettings {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            jpeg_quality: config.jpeg_quality,
            frame_interval: config.frame_interval(),
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

/// A loaded detection channel.
pub struct ChannelProcessor {
    channel: Channel,
    pipeline: DetectionPipeline,
    policy: Arc<dyn AlertPolicy>,
    board: Arc<AlertBoard>,
    settings: StreamSettings,
    open_source: SourceFactory,
}

impl ChannelProcessor {
    /// Load the channel's detector and bind its video.
    pub fn new(
        channel: Channel,
        config: &ChannelConfig,
        detection: &DetectionConfig,
        board: Arc<AlertBoard>,
    ) -> Result<Self, VisionError> {
        config.policy.validate().map_err(VisionError::Config)?;
        let detector = load_detector(&config.model)?;
        let video: PathBuf = config.video.clone();

        info!(
            "Channel {} ready: model {:?} ({}), video {:?}",
            channel,
            config.model,
            detector.name(),
            video
        );

        Ok(Self::from_parts(
            channel,
            detector,
            Arc::new(move || open_source(&video)),
            Arc::from(config.policy.build()),
            board,
            StreamSettings::from(detection),
        ))
    }

    /// Assemble a processor from already-built parts.
    pub fn from_parts(
        channel: Channel,
        detector: Arc<dyn Detector>,
        open_source: SourceFactory,
        policy: Arc<dyn AlertPolicy>,
        board: Arc<AlertBoard>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            channel,
            pipeline: DetectionPipeline::new(detector, settings.confidence_threshold),
            policy,
            board,
            settings,
            open_source,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn settings(&self) -> StreamSettings {
        self.settings
    }

    pub fn board(&self) -> &Arc<AlertBoard> {
        &self.board
    }

    /// Open an independent loop over the channel's video for one viewer.
    pub fn open_loop(&self) -> Result<FrameLoop, VisionError> {
        let source = (self.open_source)()?;
        debug!("Opened {} for channel {}", source.describe(), self.channel);

        Ok(FrameLoop {
            channel: self.channel,
            source: LoopingSource::new(source),
            pipeline: self.pipeline.clone(),
            policy: self.policy.clone(),
            board: self.board.clone(),
            jpeg_quality: self.settings.jpeg_quality,
            frames_streamed: 0,
            frames_dropped: 0,
        })
    }
}

/// Decode, detect, debounce, draw and encode, one frame per call.
pub struct FrameLoop {
    channel: Channel,
    source: LoopingSource,
    pipeline: DetectionPipeline,
    policy: Arc<dyn AlertPolicy>,
    board: Arc<AlertBoard>,
    jpeg_quality: u8,
    frames_streamed: u64,
    frames_dropped: u64,
}

impl FrameLoop {
    /// Next multipart chunk, or `None` once the source cannot produce frames.
    ///
    /// Frames that fail to encode are dropped and the next one is tried.
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        loop {
            let frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Stream for channel {} ended: {}", self.channel, e);
                    return None;
                }
            };

            let image = self.annotate(frame.image);

            match encode_jpeg(&image, self.jpeg_quality) {
                Ok(jpeg) => {
                    self.frames_streamed += 1;
                    return Some(multipart_part(&jpeg));
                }
                Err(e) => {
                    warn!("Dropping frame {} of channel {}: {}", frame.index, self.channel, e);
                    self.frames_dropped += 1;
                }
            }
        }
    }

    /// Run detection and draw the results, updating the alert board only when
    /// both succeed. On failure the frame is returned unannotated.
    fn annotate(&mut self, image: RgbImage) -> RgbImage {
        let detections = match self.pipeline.detect(&image) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Detection failed on channel {}: {}", self.channel, e);
                return image;
            }
        };

        if detections.is_empty() {
            self.board.observe(self.channel, self.policy.qualifies(&detections));
            return image;
        }

        let mut annotated = image.clone();
        match render_detections(&mut annotated, &detections) {
            Ok(()) => {
                self.board.observe(self.channel, self.policy.qualifies(&detections));
                annotated
            }
            Err(e) => {
                warn!("Rendering failed on channel {}: {}", self.channel, e);
                image
            }
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn frames_streamed(&self) -> u64 {
        self.frames_streamed
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Completed passes over the video.
    pub fn passes(&self) -> u64 {
        self.source.passes()
    }
}
