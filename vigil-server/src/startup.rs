// Start-up wiring: alert board and channel processors

use crate::http::ApiState;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use vigil_core::{AlertBoard, Channel, VigilConfig};
use vigil_eye::ChannelProcessor;

/// Load a processor for every configured channel whose inputs are present.
///
/// Channels with a missing model or video, or whose detector fails to load,
/// are skipped; they keep their (inactive) alert record.
pub fn initialize_processors(
    config: &VigilConfig,
    board: &Arc<AlertBoard>,
) -> BTreeMap<Channel, Arc<ChannelProcessor>> {
    let mut processors = BTreeMap::new();

    for (channel, channel_config) in &config.channels {
        if !channel_config.model.exists() {
            warn!("Model file not found for {}: {:?}", channel, channel_config.model);
            continue;
        }
        if !channel_config.video.exists() {
            warn!("Video file not found for {}: {:?}", channel, channel_config.video);
            continue;
        }

        match ChannelProcessor::new(*channel, channel_config, &config.detection, board.clone()) {
            Ok(processor) => {
                info!("Initialized {} processor", channel);
                processors.insert(*channel, Arc::new(processor));
            }
            Err(e) => error!("Failed to initialize {} processor: {}", channel, e),
        }
    }

    info!(
        "{} of {} channels active",
        processors.len(),
        config.channels.len()
    );
    processors
}

/// Build the alert board and processors for `config`.
pub fn build_state(config: &VigilConfig) -> ApiState {
    let board = Arc::new(AlertBoard::new(
        config.channels.keys().copied(),
        config.detection.debounce_window(),
    ));
    let processors = initialize_processors(config, &board);
    ApiState::new(processors, board)
}
