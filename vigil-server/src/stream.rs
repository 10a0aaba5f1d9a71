//! MJPEG response body
//!
//! Each response owns one [`FrameLoop`]. Frames are produced on the blocking
//! pool and paced to the channel's frame interval. The stream ends when the
//! source gives out or the server shuts down; dropping the body (client
//! disconnect) drops the loop.

use crate::http::ApiError;
use crate::metrics::{ActiveStream, StreamMetrics};
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::Response;
use bytes::Bytes;
use futures::stream::{self, Stream};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info};
use vigil_eye::processing::BOUNDARY;
use vigil_eye::{ChannelProcessor, FrameLoop};

/// Build the `multipart/x-mixed-replace` response for one viewer.
pub fn mjpeg_response(
    processor: Arc<ChannelProcessor>,
    metrics: &Arc<StreamMetrics>,
    shutdown: watch::Receiver<bool>,
) -> Result<Response, ApiError> {
    let channel = processor.channel();
    let frames = processor
        .open_loop()
        .map_err(|e| ApiError::Internal(format!("Cannot open video for {}: {}", channel, e)))?;

    info!("Streaming channel {}", channel);
    let body = Body::from_stream(frame_stream(
        frames,
        processor.settings().frame_interval,
        metrics.open_stream(channel),
        shutdown,
    ));

    Response::builder()
        .header(CONTENT_TYPE, format!("multipart/x-mixed-replace; boundary={}", BOUNDARY))
        .header(CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build stream response: {}", e)))
}

/// Lazily produce multipart chunks, at most one per `interval`.
pub fn frame_stream(
    frames: FrameLoop,
    interval: Duration,
    active: ActiveStream,
    shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    stream::unfold((frames, active, shutdown), move |(frames, active, shutdown)| async move {
        let stopping = *shutdown.borrow();
        if stopping {
            info!("Closing stream for channel {} on shutdown", active.channel());
            return None;
        }

        let start = Instant::now();
        let dropped_before = frames.frames_dropped();

        let produced = tokio::task::spawn_blocking(move || {
            let mut frames = frames;
            let chunk = frames.next_chunk();
            (frames, chunk)
        })
        .await;

        let (frames, chunk) = match produced {
            Ok(result) => result,
            Err(e) => {
                error!("Frame worker for channel {} failed: {}", active.channel(), e);
                return None;
            }
        };

        active.record_dropped(frames.frames_dropped() - dropped_before);
        let Some(chunk) = chunk else {
            info!("Stream for channel {} finished", active.channel());
            return None;
        };
        active.record_streamed(1);

        let elapsed = start.elapsed();
        if elapsed < interval {
            tokio::time::sleep(interval - elapsed).await;
        }

        Some((Ok(chunk), (frames, active, shutdown)))
    })
}
