// HTTP API tests against the in-process router

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use image::{Rgb, RgbImage};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use vigil_core::policy::AnyDetection;
use vigil_core::{AlertBoard, BoundingBox, Channel, Detection, ServerConfig};
use vigil_eye::{ChannelProcessor, Detector, FrameSource, MemorySource, SourceFactory, StreamSettings, VisionError};
use vigil_server::ApiState;

/// Sees a person in every frame.
struct AlwaysPerson;

impl Detector for AlwaysPerson {
    fn detect(&self, _frame: &RgbImage, _threshold: f32) -> Result<Vec<Detection>, VisionError> {
        Ok(vec![Detection::new(0, "person", 0.92, BoundingBox::new(2.0, 2.0, 12.0, 20.0))])
    }

    fn name(&self) -> &str {
        "always-person"
    }
}

fn memory_factory(frames: usize) -> SourceFactory {
    Arc::new(move || {
        let images = (0..frames)
            .map(|i| RgbImage::from_pixel(32, 24, Rgb([0, i as u8 * 20, 0])))
            .collect();
        Ok(Box::new(MemorySource::new(images)) as Box<dyn FrameSource>)
    })
}

/// Person channel loaded; helmet and vest configured but not loaded.
fn create_test_state() -> ApiState {
    let board = Arc::new(AlertBoard::new(Channel::ALL, Duration::from_secs(3)));
    let processor = ChannelProcessor::from_parts(
        Channel::Person,
        Arc::new(AlwaysPerson),
        memory_factory(3),
        Arc::new(AnyDetection),
        board.clone(),
        StreamSettings::default(),
    );
    let processors = BTreeMap::from([(Channel::Person, Arc::new(processor))]);
    ApiState::new(processors, board)
}

fn create_test_app(state: ApiState) -> Router {
    vigil_server::create_router(state, &ServerConfig::default())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_root() {
    let (status, json) = get_json(create_test_app(create_test_state()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "AI Surveillance System API");
    assert_eq!(json["status"], "running");
}

#[tokio::test]
async fn test_unknown_channel_is_404() {
    let (status, json) = get_json(create_test_app(create_test_state()), "/api/video/drone").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["detail"].as_str().unwrap().contains("drone"));
}

#[tokio::test]
async fn test_unloaded_channel_is_404() {
    let (status, json) = get_json(create_test_app(create_test_state()), "/api/video/helmet").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["detail"], "Model helmet not found");
}

#[tokio::test]
async fn test_alerts_cover_every_configured_channel() {
    let (status, json) = get_json(create_test_app(create_test_state()), "/api/alerts").await;
    assert_eq!(status, StatusCode::OK);

    let alerts = json["alerts"].as_object().unwrap();
    assert_eq!(alerts.len(), 3);
    for name in ["helmet", "vest", "person"] {
        assert_eq!(alerts[name], Value::Bool(false));
    }
    assert!(json["timestamp"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_alert_timestamps_do_not_decrease() {
    let state = create_test_state();
    let mut last = 0.0;
    for _ in 0..20 {
        let (_, json) = get_json(create_test_app(state.clone()), "/api/alerts").await;
        let timestamp = json["timestamp"].as_f64().unwrap();
        assert!(timestamp >= last);
        last = timestamp;
    }
}

#[tokio::test]
async fn test_status_lists_loaded_models_only() {
    let (status, json) = get_json(create_test_app(create_test_state()), "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["models"], serde_json::json!(["person"]));
    assert_eq!(json["active_processors"], 1);
    assert_eq!(json["alert_status"].as_object().unwrap().len(), 3);
    assert!(json["system_time"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_video_stream_yields_jpeg_parts_and_raises_alert() {
    let state = create_test_state();
    let board = state.board.clone();
    let metrics = state.metrics.clone();

    let response = create_test_app(state)
        .oneshot(Request::builder().uri("/api/video/person").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let mut body = response.into_body().into_data_stream();
    for _ in 0..2 {
        let chunk = body.next().await.unwrap().unwrap();
        assert!(chunk.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(chunk.windows(2).any(|w| w == [0xFF, 0xD8]));
        assert!(chunk.ends_with(b"\r\n"));
    }

    assert!(board.is_active(Channel::Person));
    assert!(!board.is_active(Channel::Helmet));
    assert_eq!(metrics.active_streams(), 1);

    // Client disconnect
    drop(body);
    assert_eq!(metrics.active_streams(), 0);
}

#[tokio::test]
async fn test_stream_ends_on_shutdown() {
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let state = create_test_state().with_shutdown(shutdown_rx);

    let response = create_test_app(state)
        .oneshot(Request::builder().uri("/api/video/person").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();
    assert!(body.next().await.is_some());

    shutdown_tx.send(true).unwrap();
    assert!(body.next().await.is_none());
}

#[tokio::test]
async fn test_cors_preflight_mirrors_request() {
    let response = create_test_app(create_test_state())
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/alerts")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-custom-header")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5173");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "DELETE");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-custom-header");
}

#[tokio::test]
async fn test_cors_rejects_unlisted_origin() {
    let response = create_test_app(create_test_state())
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
