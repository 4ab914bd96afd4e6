//! Highlighted-item detection.
//!
//! The game renders the currently selected control as a solid accent-colored
//! rectangle with dark text; unselected controls are accent text or thin
//! outlines on a dark background. Only one element is highlighted at a time,
//! so "find the selection" reduces to "find the one solid filled region big
//! enough to be the control we expect".
//!
//! Pipeline: HSV band mask -> masked grayscale -> Otsu binarize ->
//! morphological opening (drops text strokes and specks, keeps solid fills)
//! -> external contours -> first bounding box above the size gate.

use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::morphology::open;

use crate::geometry::Quad;
use crate::image::{Color, OwnedImage, debug_snapshot};

/// HSV band covering both UI accent colors (any hue, saturated and bright).
/// Hue uses the 0-179 convention, saturation and value 0-255.
pub const HIGHLIGHT_LO: [u8; 3] = [0, 100, 180];
pub const HIGHLIGHT_HI: [u8; 3] = [179, 255, 255];

/// Tolerance on the requested minimum size, absorbing anti-aliasing and
/// stream-compression shrinkage of the filled region.
const SIZE_TOLERANCE: f32 = 0.85;

/// A located highlight: the crop and its position in percent of the input.
#[derive(Debug, Clone)]
pub struct Detection {
    pub image: OwnedImage,
    pub quad: Quad,
}

/// Find the highlighted control in `image`.
///
/// `min_w` / `min_h` are the expected minimum size of the control as a
/// fraction (0.0 - 1.0) of the input image. Returns the first match, not an
/// exhaustive list; callers advance the in-game selection and re-invoke to
/// enumerate.
pub fn highlighted_item(image: &OwnedImage, min_w: f32, min_h: f32) -> Option<Detection> {
    let img_w = image.width();
    let img_h = image.height();
    if img_w == 0 || img_h == 0 {
        return None;
    }

    let gray = masked_gray(image, HIGHLIGHT_LO, HIGHLIGHT_HI);

    let level = otsu_level(&gray);
    let bin = threshold(&gray, level, ThresholdType::Binary);

    // Opening with a kernel ~10% of the smaller expected dimension: erosion
    // kills text strokes and stray lines, dilation restores the surviving
    // solid regions to their original extent.
    let k = (img_w as f32 * min_w).min(img_h as f32 * min_h) / 10.0;
    let opened = if k >= 2.0 {
        let radius = ((k / 2.0) as u32).clamp(1, u8::MAX as u32) as u8;
        open(&bin, Norm::LInf, radius)
    } else {
        bin
    };
    debug_snapshot(&OwnedImage::from_gray(&opened), "detect_opened");

    let min_w_px = img_w as f32 * min_w * SIZE_TOLERANCE;
    let min_h_px = img_h as f32 * min_h * SIZE_TOLERANCE;

    for contour in find_contours::<i32>(&opened) {
        if contour.border_type != BorderType::Outer {
            continue;
        }

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i32::MIN;
        let mut max_y = i32::MIN;
        for p in &contour.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if min_x < 0 || min_y < 0 {
            continue;
        }

        let w = (max_x - min_x + 1) as f32;
        let h = (max_y - min_y + 1) as f32;
        if w > min_w_px && h > min_h_px {
            let x = min_x as u32;
            let y = min_y as u32;
            let crop = image
                .as_image()
                .sub_image(x, y, w as u32, h as u32)
                .to_owned_image();
            debug_snapshot(&crop, "detect_selected");
            let quad = Quad::from_rect([
                x as f32 / img_w as f32,
                y as f32 / img_h as f32,
                (x as f32 + w) / img_w as f32,
                (y as f32 + h) / img_h as f32,
            ]);
            return Some(Detection { image: crop, quad });
        }
    }

    None
}

/// Grayscale image keeping luma only where the pixel falls inside the HSV
/// band; everything else is black.
fn masked_gray(image: &OwnedImage, lo: [u8; 3], hi: [u8; 3]) -> image::GrayImage {
    let mut out = image::GrayImage::new(image.width(), image.height());
    let view = image.as_image();
    for y in 0..image.height() {
        for x in 0..image.width() {
            let color = view.pixel_at(x, y);
            let hsv = rgb_to_hsv(color);
            let inside = (lo[0]..=hi[0]).contains(&hsv[0])
                && (lo[1]..=hi[1]).contains(&hsv[1])
                && (lo[2]..=hi[2]).contains(&hsv[2]);
            if inside {
                out.put_pixel(x, y, image::Luma([color.luma()]));
            }
        }
    }
    out
}

/// RGB -> HSV with hue on the halved 0-179 scale.
fn rgb_to_hsv(c: Color) -> [u8; 3] {
    let r = c.r as f32 / 255.0;
    let g = c.g as f32 / 255.0;
    let b = c.b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h_deg = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    [
        (h_deg / 2.0).round().min(179.0) as u8,
        (s * 255.0).round() as u8,
        (v * 255.0).round() as u8,
    ]
}
