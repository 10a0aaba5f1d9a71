// HTTP API: health root, MJPEG video streams and alert polling

use crate::metrics::StreamMetrics;
use crate::stream::mjpeg_response;
use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use vigil_core::{AlertBoard, Channel, ServerConfig};
use vigil_eye::ChannelProcessor;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct ApiState {
    /// Channels whose detector and video loaded at start-up
    pub processors: Arc<BTreeMap<Channel, Arc<ChannelProcessor>>>,
    /// Alert records for every configured channel
    pub board: Arc<AlertBoard>,
    pub metrics: Arc<StreamMetrics>,
    pub clock: Arc<WallClock>,
    /// Flips to `true` when the server is shutting down; open streams end
    pub shutdown: watch::Receiver<bool>,
}

impl ApiState {
    pub fn new(processors: BTreeMap<Channel, Arc<ChannelProcessor>>, board: Arc<AlertBoard>) -> Self {
        Self {
            processors: Arc::new(processors),
            board,
            metrics: Arc::new(StreamMetrics::new()),
            clock: Arc::new(WallClock::default()),
            shutdown: watch::channel(false).1,
        }
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Unix time in fractional seconds that never goes backwards between calls.
#[derive(Debug, Default)]
pub struct WallClock {
    last_micros: AtomicU64,
}

impl WallClock {
    pub fn now(&self) -> f64 {
        let micros = chrono::Utc::now().timestamp_micros().max(0) as u64;
        let previous = self.last_micros.fetch_max(micros, Ordering::SeqCst);
        previous.max(micros) as f64 / 1_000_000.0
    }
}

/// Errors returned to HTTP clients as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorResponse { detail: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct AlertsResponse {
    alerts: BTreeMap<Channel, bool>,
    timestamp: f64,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    models: Vec<Channel>,
    alert_status: BTreeMap<Channel, bool>,
    system_time: f64,
    active_processors: usize,
}

/// Create the API router
pub fn create_router(state: ApiState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/video/:channel", get(video_handler))
        .route("/api/alerts", get(alerts_handler))
        .route("/api/status", get(status_handler))
        .layer(build_cors_layer(server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins with credentials; methods and headers
/// are mirrored from the preflight request.
pub fn build_cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn root_handler() -> impl IntoResponse {
    Json(RootResponse {
        message: "AI Surveillance System API",
        status: "running",
    })
}

async fn video_handler(State(state): State<ApiState>, Path(channel): Path<String>) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound(format!("Model {} not found", channel));

    let key: Channel = channel.parse().map_err(|_| not_found())?;
    let processor = state.processors.get(&key).ok_or_else(not_found)?;

    mjpeg_response(processor.clone(), &state.metrics, state.shutdown.clone())
}

async fn alerts_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(AlertsResponse {
        alerts: state.board.snapshot(),
        timestamp: state.clock.now(),
    })
}

async fn status_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(StatusResponse {
        models: state.processors.keys().copied().collect(),
        alert_status: state.board.snapshot(),
        system_time: state.clock.now(),
        active_processors: state.processors.len(),
    })
}
