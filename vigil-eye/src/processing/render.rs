//! Detection overlay
//!
//! Every detection gets a box outline and a filled label tab in its class
//! colour. With the `opencv` feature the shapes and the label text
//! (`person 0.92`) are drawn through `imgproc`; without it the box and a
//! blank tab are painted directly into the buffer.

use crate::error::VisionError;
use image::{Rgb, RgbImage};
use vigil_core::{BoundingBox, Detection};

const LINE_THICKNESS: u32 = 2;
const TAB_HEIGHT: u32 = 14;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const PALETTE: [[u8; 3]; 8] = [
    [0, 255, 0],
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [72, 249, 10],
    [0, 194, 255],
    [52, 69, 147],
    [203, 56, 255],
];

/// Inclusive pixel corners `(x0, y0, x1, y1)` of a clipped box.
type Corners = (u32, u32, u32, u32);

/// Stable colour for a class id.
pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Text shown in a detection's label tab.
pub fn label_text(det: &Detection) -> String {
    format!("{} {:.2}", det.label, det.confidence)
}

/// Draw every detection onto `frame` in place.
///
/// Boxes are clipped to the frame. All boxes are checked before anything is
/// drawn, so a non-finite box is an error that leaves the frame untouched.
pub fn render_detections(frame: &mut RgbImage, detections: &[Detection]) -> Result<(), VisionError> {
    let mut visible = Vec::with_capacity(detections.len());
    for det in detections {
        if let Some(corners) = clip(&det.bbox, frame.dimensions())? {
            visible.push((det, corners));
        }
    }

    if visible.is_empty() {
        return Ok(());
    }
    draw(frame, &visible)
}

/// Rows covered by the label tab: above the box, or inside it when the box
/// touches the top of the frame.
fn tab_rows(y0: u32, frame_height: u32) -> (u32, u32) {
    let tab_y0 = if y0 >= TAB_HEIGHT { y0 - TAB_HEIGHT } else { y0 };
    (tab_y0, (tab_y0 + TAB_HEIGHT).min(frame_height))
}

#[cfg(feature = "opencv")]
fn draw(frame: &mut RgbImage, visible: &[(&Detection, Corners)]) -> Result<(), VisionError> {
    use opencv::core::{Mat, Point, Scalar, CV_8UC3};
    use opencv::imgproc;
    use opencv::prelude::*;

    const FONT: i32 = imgproc::FONT_HERSHEY_SIMPLEX;
    const FONT_SCALE: f64 = 0.4;

    // The canvas holds RGB bytes, so scalars are given in RGB order too
    fn scalar(color: Rgb<u8>) -> Scalar {
        Scalar::new(color[0] as f64, color[1] as f64, color[2] as f64, 0.0)
    }

    let (width, height) = frame.dimensions();
    let mut canvas = Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))?;
    canvas.data_bytes_mut()?.copy_from_slice(frame.as_raw());

    for (det, (x0, y0, x1, y1)) in visible {
        let color = scalar(class_color(det.class_id));
        imgproc::rectangle_points(
            &mut canvas,
            Point::new(*x0 as i32, *y0 as i32),
            Point::new(*x1 as i32, *y1 as i32),
            color,
            LINE_THICKNESS as i32,
            imgproc::LINE_8,
            0,
        )?;

        let text = label_text(det);
        let mut baseline = 0;
        let text_size = imgproc::get_text_size(&text, FONT, FONT_SCALE, 1, &mut baseline)?;
        let tab_w = (text_size.width.max(0) as u32 + 6).min(width - x0);
        let (tab_y0, tab_y1) = tab_rows(*y0, height);

        imgproc::rectangle_points(
            &mut canvas,
            Point::new(*x0 as i32, tab_y0 as i32),
            Point::new((x0 + tab_w - 1) as i32, (tab_y1 - 1) as i32),
            color,
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
        imgproc::put_text(
            &mut canvas,
            &text,
            Point::new(*x0 as i32 + 3, tab_y1 as i32 - 3),
            FONT,
            FONT_SCALE,
            scalar(TEXT_COLOR),
            1,
            imgproc::LINE_8,
            false,
        )?;
    }

    frame.copy_from_slice(canvas.data_bytes()?);
    Ok(())
}

#[cfg(not(feature = "opencv"))]
fn draw(frame: &mut RgbImage, visible: &[(&Detection, Corners)]) -> Result<(), VisionError> {
    /// Approximate glyph width used to size the blank tab.
    const CHAR_WIDTH: u32 = 7;

    for (det, (x0, y0, x1, y1)) in visible {
        let (x0, y0, x1, y1) = (*x0, *y0, *x1, *y1);
        let color = class_color(det.class_id);

        // Outline, thickened inwards
        for t in 0..LINE_THICKNESS {
            if x0 + t > x1.saturating_sub(t) || y0 + t > y1.saturating_sub(t) {
                break;
            }
            draw_hline(frame, x0 + t, x1 - t, y0 + t, color);
            draw_hline(frame, x0 + t, x1 - t, y1 - t, color);
            draw_vline(frame, x0 + t, y0 + t, y1 - t, color);
            draw_vline(frame, x1 - t, y0 + t, y1 - t, color);
        }

        let tab_w = (label_text(det).len() as u32 * CHAR_WIDTH + 6).min(frame.width() - x0);
        let (tab_y0, tab_y1) = tab_rows(y0, frame.height());
        for y in tab_y0..tab_y1 {
            draw_hline(frame, x0, x0 + tab_w - 1, y, color);
        }
    }
    Ok(())
}

/// Box corners as inclusive pixel coordinates inside the frame, or `None`
/// when the box is entirely outside.
fn clip(bbox: &BoundingBox, (width, height): (u32, u32)) -> Result<Option<Corners>, VisionError> {
    if ![bbox.x, bbox.y, bbox.width, bbox.height].iter().all(|v| v.is_finite()) {
        return Err(VisionError::Processing(format!("cannot draw non-finite box {:?}", bbox)));
    }
    if width == 0 || height == 0 || bbox.width <= 0.0 || bbox.height <= 0.0 {
        return Ok(None);
    }

    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let left = bbox.x;
    let top = bbox.y;
    let right = bbox.x + bbox.width;
    let bottom = bbox.y + bbox.height;
    if right < 0.0 || bottom < 0.0 || left > max_x || top > max_y {
        return Ok(None);
    }

    Ok(Some((
        left.clamp(0.0, max_x) as u32,
        top.clamp(0.0, max_y) as u32,
        right.clamp(0.0, max_x) as u32,
        bottom.clamp(0.0, max_y) as u32,
    )))
}

#[cfg(not(feature = "opencv"))]
fn draw_hline(frame: &mut RgbImage, x0: u32, x1: u32, y: u32, color: Rgb<u8>) {
    for x in x0..=x1 {
        frame.put_pixel(x, y, color);
    }
}

#[cfg(not(feature = "opencv"))]
fn draw_vline(frame: &mut RgbImage, x: u32, y0: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..=y1 {
        frame.put_pixel(x, y, color);
    }
}
