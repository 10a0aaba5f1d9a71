//! End-to-end tests for the per-viewer processing loop

use image::{Rgb, RgbImage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use vigil_core::policy::MissingGear;
use vigil_core::{AlertBoard, BoundingBox, Channel, Detection};
use vigil_eye::{
    ChannelProcessor, Detector, FrameSource, ImageSequenceSource, SourceFactory, StreamSettings, VisionError,
};

/// Reports a helmet-less person on frames whose red channel is bright.
struct RedMeansPerson;

impl Detector for RedMeansPerson {
    fn detect(&self, frame: &RgbImage, _threshold: f32) -> Result<Vec<Detection>, VisionError> {
        if frame.get_pixel(0, 0)[0] > 128 {
            Ok(vec![Detection::new(
                0,
                "person",
                0.8,
                BoundingBox::new(4.0, 4.0, 20.0, 20.0),
            )])
        } else {
            Ok(vec![])
        }
    }

    fn name(&self) -> &str {
        "red-means-person"
    }
}

fn write_sequence(dir: &std::path::Path, reds: &[u8]) {
    for (i, red) in reds.iter().enumerate() {
        RgbImage::from_pixel(32, 32, Rgb([*red, 0, 0]))
            .save(dir.join(format!("{:04}.png", i)))
            .unwrap();
    }
}

fn processor_for(dir: &std::path::Path, board: Arc<AlertBoard>) -> ChannelProcessor {
    let dir = dir.to_path_buf();
    let factory: SourceFactory =
        Arc::new(move || Ok(Box::new(ImageSequenceSource::open(&dir)?) as Box<dyn FrameSource>));
    ChannelProcessor::from_parts(
        Channel::Helmet,
        Arc::new(RedMeansPerson),
        factory,
        Arc::new(MissingGear::new("person", ["helmet"])),
        board,
        StreamSettings::default(),
    )
}

#[test]
fn test_image_sequence_stream_drives_alert() {
    let dir = TempDir::new().unwrap();
    write_sequence(dir.path(), &[0, 255, 0]);

    let board = Arc::new(AlertBoard::new(Channel::ALL, Duration::from_secs(3)));
    let processor = processor_for(dir.path(), board.clone());
    let mut frames = processor.open_loop().unwrap();

    let first = frames.next_chunk().unwrap();
    assert!(first.starts_with(b"--frame\r\n"));
    assert!(!board.is_active(Channel::Helmet));

    frames.next_chunk().unwrap();
    assert!(board.is_active(Channel::Helmet));

    // Looping keeps the stream alive past the last file
    for _ in 0..4 {
        assert!(frames.next_chunk().is_some());
    }
    assert!(frames.passes() >= 1);

    // Absent frames keep the alert on until the window has elapsed
    assert!(board.is_active(Channel::Helmet));
    assert!(!board.is_active_at(Channel::Helmet, Instant::now() + Duration::from_secs(4)));

    // Other channels were never touched
    assert!(!board.is_active(Channel::Vest));
    assert!(!board.is_active(Channel::Person));
}

#[test]
fn test_stream_ends_when_frames_disappear() {
    let dir = TempDir::new().unwrap();
    write_sequence(dir.path(), &[0, 0]);

    let board = Arc::new(AlertBoard::default());
    let processor = processor_for(dir.path(), board);
    let mut frames = processor.open_loop().unwrap();
    assert!(frames.next_chunk().is_some());

    // Replace every file with garbage: the retry after rewind fails too
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        std::fs::write(entry.unwrap().path(), b"corrupt").unwrap();
    }
    assert!(frames.next_chunk().is_none());
}

#[test]
fn test_open_loop_fails_for_missing_directory() {
    let dir = TempDir::new().unwrap();
    let board = Arc::new(AlertBoard::default());
    let processor = processor_for(&dir.path().join("missing"), board);
    assert!(processor.open_loop().is_err());
}

#[test]
fn test_new_with_unloadable_model_reports_error() {
    let dir = TempDir::new().unwrap();
    write_sequence(dir.path(), &[0]);
    let model = dir.path().join("helmet_model.onnx");
    std::fs::write(&model, b"weights").unwrap();

    let config = vigil_core::ChannelConfig::new(&model, dir.path());
    let result = ChannelProcessor::new(
        Channel::Helmet,
        &config,
        &vigil_core::DetectionConfig::default(),
        Arc::new(AlertBoard::default()),
    );

    if cfg!(feature = "onnx") {
        // The runtime itself rejects the artifact
        match result {
            Err(VisionError::Ort(msg)) => assert!(msg.contains("helmet_model.onnx")),
            Err(e) => panic!("Expected ONNX Runtime error, got {}", e),
            Ok(_) => panic!("Expected ONNX Runtime error, got a processor"),
        }
    } else {
        match result {
            Err(VisionError::Config(msg)) => assert!(msg.contains("onnx")),
            Err(e) => panic!("Expected Config error, got {}", e),
            Ok(_) => panic!("Expected Config error, got a processor"),
        }
    }
}
