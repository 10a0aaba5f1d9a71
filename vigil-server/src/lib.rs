//! vigil-server: HTTP surface of the surveillance service
//!
//! Routes, CORS, the MJPEG streaming body, start-up wiring of the channel
//! processors and configuration loading for the `vigil-server` binary.

pub mod config_manager;
pub mod http;
pub mod metrics;
pub mod startup;
pub mod stream;

pub use config_manager::{load_config, Cli, ConfigLoadError};
pub use http::{create_router, ApiError, ApiState};
pub use startup::{build_state, initialize_processors};
