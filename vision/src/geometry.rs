//! Point and quadrilateral algebra.
//!
//! All screen regions in this project are quadrilaterals. Most are plain
//! axis-aligned rectangles, but cockpit panels are rendered at an angle by the
//! game camera, so the general form is a parallelogram-ish quad whose corners
//! were calibrated by the operator.
//!
//! Coordinates are unit-agnostic: the same types carry percent-of-screen
//! values (0.0 - 1.0) and pixel values. Conversion between the two is always
//! explicit (`scale_from_origin` with the screen dimensions).
//!
//! Mutators consume and return `Self`; nothing here mutates in place. Call
//! sites rely on that to avoid aliasing a quad that is also stored in the
//! calibration registry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four-point polygon in top-left, top-right, bottom-right, bottom-left order.
///
/// Accessors (`left`, `top`, `width`, ...) are extrema over the four points,
/// not edge midpoints: for a skewed quad the bounding box is what capture and
/// cropping code needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub tl: Point,
    pub tr: Point,
    pub br: Point,
    pub bl: Point,
}

impl Quad {
    pub const fn new(tl: Point, tr: Point, br: Point, bl: Point) -> Self {
        Self { tl, tr, br, bl }
    }

    /// Axis-aligned quad from `[left, top, right, bottom]`.
    pub const fn from_rect(rect: [f32; 4]) -> Self {
        Self {
            tl: Point::new(rect[0], rect[1]),
            tr: Point::new(rect[2], rect[1]),
            br: Point::new(rect[2], rect[3]),
            bl: Point::new(rect[0], rect[3]),
        }
    }

    /// Combine two calibrated axis-aligned rectangles into a skewed quad.
    ///
    /// The operator drags one rectangle touching the panel's top-left and
    /// bottom-right corners and another touching its top-right and
    /// bottom-left. Together they pin all four corners of a panel that the
    /// camera renders slightly rotated.
    pub fn from_bounds_pair(tlbr: Quad, trbl: Quad) -> Self {
        Self {
            tl: Point::new(tlbr.left(), tlbr.top()),
            tr: Point::new(trbl.right(), trbl.top()),
            br: Point::new(tlbr.right(), tlbr.bottom()),
            bl: Point::new(trbl.left(), trbl.bottom()),
        }
    }

    pub fn left(&self) -> f32 {
        self.tl.x.min(self.tr.x).min(self.br.x).min(self.bl.x)
    }

    pub fn top(&self) -> f32 {
        self.tl.y.min(self.tr.y).min(self.br.y).min(self.bl.y)
    }

    pub fn right(&self) -> f32 {
        self.tl.x.max(self.tr.x).max(self.br.x).max(self.bl.x)
    }

    pub fn bottom(&self) -> f32 {
        self.tl.y.max(self.tr.y).max(self.br.y).max(self.bl.y)
    }

    pub fn width(&self) -> f32 {
        self.right() - self.left()
    }

    pub fn height(&self) -> f32 {
        self.bottom() - self.top()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.tl.x + self.tr.x + self.br.x + self.bl.x) / 4.0,
            (self.tl.y + self.tr.y + self.br.y + self.bl.y) / 4.0,
        )
    }

    /// Bounding box as `[left, top, right, bottom]`.
    pub fn to_rect(&self) -> [f32; 4] {
        [self.left(), self.top(), self.right(), self.bottom()]
    }

    /// Bounding box rounded to `digits` decimal places (persisted rects use 4).
    pub fn to_rect_rounded(&self, digits: u32) -> [f32; 4] {
        let r = self.to_rect();
        [
            round_dp(r[0], digits),
            round_dp(r[1], digits),
            round_dp(r[2], digits),
            round_dp(r[3], digits),
        ]
    }

    /// Corner points as `(x, y)` tuples in TL, TR, BR, BL order.
    pub fn points(&self) -> [(f32, f32); 4] {
        [
            (self.tl.x, self.tl.y),
            (self.tr.x, self.tr.y),
            (self.br.x, self.br.y),
            (self.bl.x, self.bl.y),
        ]
    }

    /// Scale about the quad's center.
    #[must_use]
    pub fn scale(self, fx: f32, fy: f32) -> Self {
        let c = self.center();
        self.map(|p| Point::new(c.x + (p.x - c.x) * fx, c.y + (p.y - c.y) * fy))
    }

    /// Scale about the origin. Converting a percent quad to pixels is
    /// `scale_from_origin(screen_w, screen_h)`.
    #[must_use]
    pub fn scale_from_origin(self, fx: f32, fy: f32) -> Self {
        self.map(|p| Point::new(p.x * fx, p.y * fy))
    }

    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        self.map(|p| Point::new(p.x + dx, p.y + dy))
    }

    /// Re-express a child rectangle, given in percent of this quad's extent,
    /// in this quad's own coordinate space.
    ///
    /// Only meaningful for axis-aligned quads; a skewed parent is deskewed
    /// first by the callers that need sub-regions of it. `[0,0,1,1]` returns
    /// the parent unchanged, `[0,0,0.5,0.5]` its top-left quadrant.
    #[must_use]
    pub fn sub_region(self, child_pct: Quad) -> Self {
        debug_assert!(
            self.is_axis_aligned(1e-4),
            "sub_region requires an axis-aligned parent quad"
        );
        let l = self.left() + child_pct.left() * self.width();
        let t = self.top() + child_pct.top() * self.height();
        let r = self.left() + child_pct.right() * self.width();
        let b = self.top() + child_pct.bottom() * self.height();
        Self::from_rect([l, t, r, b])
    }

    pub fn is_axis_aligned(&self, eps: f32) -> bool {
        (self.tl.y - self.tr.y).abs() <= eps
            && (self.bl.y - self.br.y).abs() <= eps
            && (self.tl.x - self.bl.x).abs() <= eps
            && (self.tr.x - self.br.x).abs() <= eps
    }

    fn map(self, f: impl Fn(Point) -> Point) -> Self {
        Self {
            tl: f(self.tl),
            tr: f(self.tr),
            br: f(self.br),
            bl: f(self.bl),
        }
    }
}

fn round_dp(v: f32, digits: u32) -> f32 {
    let m = 10f32.powi(digits as i32);
    (v * m).round() / m
}
