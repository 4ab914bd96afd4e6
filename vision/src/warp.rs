//! Perspective deskewing.
//!
//! Cockpit panels are drawn at an angle by the game camera. Before any OCR or
//! sub-region cropping the captured panel is warped so that its calibrated
//! quad lands on an axis-aligned rectangle the size of the source image. The
//! inverse transform is kept alongside so detection results can be mapped
//! back onto the original (skewed) capture for overlays.

use image::Rgb;
use imageproc::geometric_transformations::{Interpolation, Projection, warp};

use crate::geometry::Quad;
use crate::image::OwnedImage;

/// Forward (deskew) and inverse transforms computed together.
///
/// Valid only for the pixel dimensions used to derive them; owned by one
/// capture cycle and recomputed on the next capture. Never persisted.
#[derive(Clone, Copy)]
pub struct PerspectivePair {
    forward: Projection,
    inverse: Projection,
    width: u32,
    height: u32,
}

impl PerspectivePair {
    /// Transform pair mapping `quad_px` (pixels, relative to the image
    /// origin) onto the full `[0,0,w,h]` rectangle.
    ///
    /// Returns `None` for degenerate quads (collinear corners).
    pub fn new(width: u32, height: u32, quad_px: &Quad) -> Option<Self> {
        let dst = [
            (0.0, 0.0),
            (width as f32, 0.0),
            (width as f32, height as f32),
            (0.0, height as f32),
        ];
        let forward = Projection::from_control_points(quad_px.points(), dst)?;
        let inverse = forward.invert();
        Some(Self {
            forward,
            inverse,
            width,
            height,
        })
    }

    /// Map a pixel-space quad from the skewed capture into deskewed space.
    pub fn deskew_quad(&self, quad_px: &Quad) -> Quad {
        self.map_quad(quad_px, self.forward)
    }

    /// Map a pixel-space quad from deskewed space back onto the skewed
    /// capture (overlay drawing).
    pub fn skew_quad(&self, quad_px: &Quad) -> Quad {
        self.map_quad(quad_px, self.inverse)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn map_quad(&self, quad: &Quad, proj: Projection) -> Quad {
        let pts = quad.points().map(|(x, y)| proj * (x, y));
        Quad::new(
            crate::geometry::Point::new(pts[0].0, pts[0].1),
            crate::geometry::Point::new(pts[1].0, pts[1].1),
            crate::geometry::Point::new(pts[2].0, pts[2].1),
            crate::geometry::Point::new(pts[3].0, pts[3].1),
        )
    }
}

/// Warp `image` so that `quad_px` fills an axis-aligned output the same size
/// as the input. Returns the straightened image and the transform pair, or
/// `None` if the quad is degenerate.
pub fn deskew(image: &OwnedImage, quad_px: &Quad) -> Option<(OwnedImage, PerspectivePair)> {
    let pair = PerspectivePair::new(image.width(), image.height(), quad_px)?;
    let rgb = image.to_rgb_image();
    let out = warp(&rgb, &pair.forward, Interpolation::Bilinear, Rgb([0, 0, 0]));
    Some((OwnedImage::from_rgb_image(&out), pair))
}
