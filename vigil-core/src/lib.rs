//! vigil-core: channel model and debounced alert state
//!
//! Everything here is independent of video decoding and HTTP: the closed set
//! of detection channels, the detector output types, the per-channel
//! qualification policies and the alert board that turns per-frame signals
//! into a polled alert flag.

pub mod alert;
pub mod channel;
pub mod config;
pub mod detection;
pub mod error;
pub mod policy;

pub use alert::{AlertBoard, AlertRecord, AlertState, AlertTransitions, DEBOUNCE_WINDOW};
pub use channel::Channel;
pub use config::{ChannelConfig, DetectionConfig, ServerConfig, VigilConfig};
pub use detection::{BoundingBox, Detection};
pub use error::{CoreError, Result};
pub use policy::{AlertPolicy, PolicyConfig};
