use metrics::{counter, gauge};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use vigil_core::Channel;

/// Stream counters exported through the `metrics` facade.
#[derive(Debug, Default)]
pub struct StreamMetrics {
    active_streams: AtomicI64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new viewer; the returned guard unregisters it on drop.
    pub fn open_stream(self: &Arc<Self>, channel: Channel) -> ActiveStream {
        let active = self.active_streams.fetch_add(1, Ordering::SeqCst) + 1;
        gauge!("vigil_active_streams").set(active as f64);
        ActiveStream {
            metrics: self.clone(),
            channel,
        }
    }

    pub fn active_streams(&self) -> i64 {
        self.active_streams.load(Ordering::SeqCst)
    }

    fn close_stream(&self) {
        let active = self.active_streams.fetch_sub(1, Ordering::SeqCst) - 1;
        gauge!("vigil_active_streams").set(active.max(0) as f64);
    }
}

/// One open MJPEG response.
#[derive(Debug)]
pub struct ActiveStream {
    metrics: Arc<StreamMetrics>,
    channel: Channel,
}

impl ActiveStream {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn record_streamed(&self, frames: u64) {
        counter!("vigil_frames_streamed_total", "channel" => self.channel.as_str()).increment(frames);
    }

    pub fn record_dropped(&self, frames: u64) {
        if frames > 0 {
            counter!("vigil_frames_dropped_total", "channel" => self.channel.as_str()).increment(frames);
        }
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        self.metrics.close_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_tracks_active_streams() {
        let metrics = Arc::new(StreamMetrics::new());
        let first = metrics.open_stream(Channel::Helmet);
        let second = metrics.open_stream(Channel::Person);
        assert_eq!(metrics.active_streams(), 2);
        assert_eq!(second.channel(), Channel::Person);

        drop(first);
        assert_eq!(metrics.active_streams(), 1);
        drop(second);
        assert_eq!(metrics.active_streams(), 0);
    }
}
