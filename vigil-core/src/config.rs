//! Configuration types for the surveillance service
//!
//! Every struct deserializes with defaults, so a partial file (or none at all)
//! yields the stock three-channel setup.

use crate::channel::Channel;
use crate::error::CoreError;
use crate::policy::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
        }
    }
}

/// Detection and streaming parameters shared by all channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum detector confidence for a box to count
    pub confidence_threshold: f32,
    /// Target stream frame rate (frames per second)
    pub frame_rate: u32,
    /// JPEG quality of streamed frames (1-100)
    pub jpeg_quality: u8,
    /// Seconds an alert stays on after detections stop
    pub debounce_secs: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            frame_rate: 30,
            jpeg_quality: 85,
            debounce_secs: 3.0,
        }
    }
}

impl DetectionConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_secs)
    }

    pub fn frame_interval(&self) -> Duration {
        let frame_rate = self.frame_rate.max(1);
        Duration::from_secs_f64(1.0 / frame_rate as f64)
    }
}

/// Model and video bound to one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Model artifact
    pub model: PathBuf,
    /// Looping video file, or a directory of still frames
    pub video: PathBuf,
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl ChannelConfig {
    pub fn new(model: impl Into<PathBuf>, video: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            video: video.into(),
            policy: PolicyConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }
}

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub server: ServerConfig,
    pub detection: DetectionConfig,
    pub channels: BTreeMap<Channel, ChannelConfig>,
}

impl Default for VigilConfig {
    fn default() -> Self {
        let channels = BTreeMap::from([
            (Channel::Helmet, ChannelConfig::new("helmet_model.onnx", "helmet.mp4")),
            (Channel::Vest, ChannelConfig::new("vest_model.onnx", "41501-429661287_small.mp4")),
            (Channel::Person, ChannelConfig::new("person_intrusion.onnx", "thief.mp4")),
        ]);

        Self {
            server: ServerConfig::default(),
            detection: DetectionConfig::default(),
            channels,
        }
    }
}

impl VigilConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |msg: String| Err(CoreError::Configuration(msg));

        if self.server.host.trim().is_empty() {
            return invalid("server.host cannot be empty".to_string());
        }

        if let Some(origin) = self.server.cors_origins.iter().find(|o| o.trim().is_empty()) {
            return invalid(format!("server.cors_origins contains an empty origin: {:?}", origin));
        }

        let threshold = self.detection.confidence_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
            return invalid(format!(
                "detection.confidence_threshold must be in (0, 1], got {}",
                threshold
            ));
        }

        if self.detection.frame_rate == 0 || self.detection.frame_rate > 120 {
            return invalid("detection.frame_rate must be between 1 and 120".to_string());
        }

        if !(1..=100).contains(&self.detection.jpeg_quality) {
            return invalid("detection.jpeg_quality must be between 1 and 100".to_string());
        }

        let debounce = self.detection.debounce_secs;
        if !debounce.is_finite() || debounce <= 0.0 || debounce > 3600.0 {
            return invalid(format!(
                "detection.debounce_secs must be in (0, 3600], got {}",
                debounce
            ));
        }

        for (channel, channel_config) in &self.channels {
            if channel_config.model.as_os_str().is_empty() || channel_config.video.as_os_str().is_empty() {
                return invalid(format!("channels.{}: model and video paths are required", channel));
            }
            channel_config
                .policy
                .validate()
                .map_err(|e| CoreError::Configuration(format!("channels.{}: {}", channel, e)))?;
        }

        Ok(())
    }
}
