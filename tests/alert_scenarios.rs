// Alert debounce scenarios across the processing loop and the board

use image::{Rgb, RgbImage};
use doubles::Script;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vigil_core::policy::MissingGear;
use vigil_core::{AlertBoard, AlertState, BoundingBox, Channel, Detection, PolicyConfig};
use vigil_eye::{ChannelProcessor, FrameSource, MemorySource, SourceFactory, StreamSettings};

const WINDOW: Duration = Duration::from_secs(3);

/// Detector doubles that answer from a per-frame script.
mod doubles {
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vigil_core::Detection;
    use vigil_eye::{Detector, VisionError};

    pub struct Script {
        frames: Vec<Vec<Detection>>,
        calls: AtomicUsize,
    }

    impl Script {
        pub fn new(frames: Vec<Vec<Detection>>) -> Self {
            Self {
                frames,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Detector for Script {
        fn detect(&self, _frame: &RgbImage, _threshold: f32) -> Result<Vec<Detection>, VisionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.frames.get(call).cloned().unwrap_or_default())
        }

        fn name(&self) -> &str {
            "script"
        }
    }
}

fn detection(label: &str, x: f32, y: f32, w: f32, h: f32) -> Detection {
    Detection::new(0, label, 0.9, BoundingBox::new(x, y, w, h))
}

fn blank_frames(count: usize) -> SourceFactory {
    Arc::new(move || {
        let frames = vec![RgbImage::from_pixel(64, 48, Rgb([90, 90, 90])); count];
        Ok(Box::new(MemorySource::new(frames)) as Box<dyn FrameSource>)
    })
}

#[test]
fn test_person_scenario_with_explicit_clock() {
    let board = AlertBoard::new([Channel::Person], WINDOW);
    let t0 = Instant::now();

    let flags: Vec<bool> = (0..5)
        .map(|i| board.observe_at(Channel::Person, true, t0 + Duration::from_millis(33 * i)))
        .collect();
    assert_eq!(flags, vec![true; 5]);

    let last_present = t0 + Duration::from_millis(33 * 4);
    let absent: Vec<bool> = (1..=2)
        .map(|i| board.observe_at(Channel::Person, false, last_present + Duration::from_millis(33 * i)))
        .collect();
    assert_eq!(absent, vec![true; 2]);
    assert_eq!(
        board.state_at(Channel::Person, last_present + Duration::from_millis(100)),
        Some(AlertState::ActivePendingClear)
    );

    // The deadline was set by the first absent frame and is never extended
    let first_absent = last_present + Duration::from_millis(33);
    assert!(board.is_active_at(Channel::Person, first_absent + WINDOW - Duration::from_millis(1)));
    assert!(!board.is_active_at(Channel::Person, first_absent + WINDOW));
    assert_eq!(
        board.state_at(Channel::Person, first_absent + WINDOW),
        Some(AlertState::Inactive)
    );
}

#[test]
fn test_redetection_cancels_pending_clear() {
    let board = AlertBoard::new([Channel::Vest], WINDOW);
    let t0 = Instant::now();

    assert!(board.observe_at(Channel::Vest, true, t0));
    assert!(board.observe_at(Channel::Vest, false, t0 + Duration::from_secs(1)));
    assert!(board.observe_at(Channel::Vest, true, t0 + Duration::from_secs(2)));

    // Original deadline (t0 + 4s) passes without clearing
    for ms in [3_000, 4_000, 4_500, 10_000] {
        assert!(board.is_active_at(Channel::Vest, t0 + Duration::from_millis(ms)));
    }
}

#[test]
fn test_stopped_stream_still_clears() {
    let board = AlertBoard::new([Channel::Helmet], WINDOW);
    let t0 = Instant::now();
    board.observe_at(Channel::Helmet, true, t0);
    board.observe_at(Channel::Helmet, false, t0 + Duration::from_millis(40));

    // No further observations: a read past the deadline sees it cleared
    let snapshot = board.snapshot_at(t0 + Duration::from_secs(5));
    assert_eq!(snapshot[&Channel::Helmet], false);
}

#[test]
fn test_never_detected_channels_stay_inactive() {
    let board = AlertBoard::default();
    let t0 = Instant::now();
    for i in 0..50 {
        board.observe_at(Channel::Helmet, false, t0 + Duration::from_millis(33 * i));
    }
    assert!(board
        .snapshot_at(t0 + Duration::from_secs(2))
        .values()
        .all(|active| !active));
}

#[test]
fn test_missing_gear_policy_through_loop() {
    let person = detection("person", 10.0, 5.0, 20.0, 40.0);
    let helmet = detection("helmet", 14.0, 5.0, 10.0, 8.0);
    let script = Script::new(vec![
        vec![person.clone(), helmet],
        vec![person.clone(), detection("helmet", 50.0, 5.0, 8.0, 8.0)],
    ]);

    let board = Arc::new(AlertBoard::new([Channel::Helmet], WINDOW));
    let processor = ChannelProcessor::from_parts(
        Channel::Helmet,
        Arc::new(script),
        blank_frames(4),
        Arc::new(MissingGear::new("person", ["helmet"])),
        board.clone(),
        StreamSettings::default(),
    );
    let mut frames = processor.open_loop().unwrap();

    // Helmet centre inside the person box: compliant
    frames.next_chunk().unwrap();
    assert!(!board.is_active(Channel::Helmet));

    // Helmet elsewhere in the frame: violation
    frames.next_chunk().unwrap();
    assert!(board.is_active(Channel::Helmet));
}

#[test]
fn test_policy_config_builds_labels_policy() {
    let policy = PolicyConfig::Labels {
        labels: vec!["Person".to_string()],
    }
    .build();
    assert!(policy.qualifies(&[detection("person", 0.0, 0.0, 1.0, 1.0)]));
    assert!(!policy.qualifies(&[detection("car", 0.0, 0.0, 1.0, 1.0)]));
    assert!(!policy.qualifies(&[]));
}

#[test]
fn test_concurrent_viewers_share_one_alert_record() {
    let person = detection("person", 10.0, 5.0, 20.0, 40.0);
    let board = Arc::new(AlertBoard::new([Channel::Person], WINDOW));
    let processor = Arc::new(ChannelProcessor::from_parts(
        Channel::Person,
        Arc::new(Script::new(vec![vec![person]; 64])),
        blank_frames(5),
        Arc::from(PolicyConfig::AnyDetection.build()),
        board.clone(),
        StreamSettings::default(),
    ));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let processor = processor.clone();
            std::thread::spawn(move || {
                let mut frames = processor.open_loop().unwrap();
                for _ in 0..10 {
                    assert!(frames.next_chunk().is_some());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(board.is_active(Channel::Person));
    assert_eq!(board.snapshot().len(), 1);
}
