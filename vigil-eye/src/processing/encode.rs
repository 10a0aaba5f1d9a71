//! JPEG encoding and MJPEG part framing

use crate::error::VisionError;
use bytes::{BufMut, Bytes, BytesMut};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};

/// Multipart boundary token used by the stream.
pub const BOUNDARY: &str = "frame";

/// Encode a frame as a baseline JPEG.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, VisionError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(VisionError::Encoding("cannot encode an empty frame".to_string()));
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode(frame.as_raw(), width, height, ColorType::Rgb8)
        .map_err(|e| VisionError::Encoding(e.to_string()))?;
    Ok(jpeg)
}

/// Wrap one JPEG as a `multipart/x-mixed-replace` part:
/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg>\r\n`.
pub fn multipart_part(jpeg: &[u8]) -> Bytes {
    let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", BOUNDARY);
    let mut part = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}
