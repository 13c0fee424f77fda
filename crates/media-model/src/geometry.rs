//! Pixel rectangles and their drawing-space quads.
//!
//! Output pixels use a top-left origin with y growing downwards. The
//! rendering surface draws in a normalized space where `(-1.0, -1.0)` is
//! the bottom-left corner and `(1.0, 1.0)` the top-right.

use serde::{Deserialize, Serialize};

use framemix_common::error::{FramemixError, FramemixResult};

/// Largest accepted canvas width or height, in pixels.
pub const MAX_CANVAS_DIMENSION: u32 = 16_384;

/// Output canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered by the canvas.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Build a canvas size, rejecting dimensions above
    /// [`MAX_CANVAS_DIMENSION`].
    pub fn checked(width: u32, height: u32) -> FramemixResult<Self> {
        if width > MAX_CANVAS_DIMENSION || height > MAX_CANVAS_DIMENSION {
            return Err(FramemixError::config(format!(
                "canvas {width}x{height} exceeds the {MAX_CANVAS_DIMENSION} pixel limit"
            )));
        }
        Ok(Self::new(width, height))
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// An axis-aligned rectangle in output pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle covering the whole canvas.
    pub fn full(canvas: Size) -> Self {
        Self::new(0, 0, canvas.width, canvas.height)
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i64 {
        self.x as i64 + self.w as i64
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.h as i64
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Whether two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.x as i64) < other.right()
            && (other.x as i64) < self.right()
            && (self.y as i64) < other.bottom()
            && (other.y as i64) < self.bottom()
    }
}

/// Four corners of a quad in drawing space, laid out as
/// `[tl.x, tl.y, bl.x, bl.y, tr.x, tr.y, br.x, br.y]` so the vertices can
/// be drawn directly as a triangle strip.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quad(pub [f32; 8]);

impl Quad {
    /// Number of vertices in the strip.
    pub const VERTEX_COUNT: usize = 4;

    pub fn top_left(&self) -> (f32, f32) {
        (self.0[0], self.0[1])
    }

    pub fn bottom_left(&self) -> (f32, f32) {
        (self.0[2], self.0[3])
    }

    pub fn top_right(&self) -> (f32, f32) {
        (self.0[4], self.0[5])
    }

    pub fn bottom_right(&self) -> (f32, f32) {
        (self.0[6], self.0[7])
    }

    /// Raw vertex data.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` of the quad.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let xs = [self.0[0], self.0[2], self.0[4], self.0[6]];
        let ys = [self.0[1], self.0[3], self.0[5], self.0[7]];
        (
            xs.iter().copied().fold(f32::INFINITY, f32::min),
            ys.iter().copied().fold(f32::INFINITY, f32::min),
            xs.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            ys.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        )
    }
}

/// Map a pixel rectangle onto the drawing-space quad covering it.
///
/// Degenerate rectangles produce degenerate quads. A zero-sized canvas
/// dimension is treated as one pixel.
pub fn to_drawing_space(rect: Rect, canvas: Size) -> Quad {
    let width = canvas.width.max(1) as f64;
    let height = canvas.height.max(1) as f64;

    // Same as `2/W * x - 1` and `2/H * (H - y) - 1`, rearranged so that
    // pixel-aligned edges land exactly on representable values.
    let x = rect.x as f64;
    let y = rect.y as f64;
    let x1 = (2.0 * x - width) / width;
    let x2 = (2.0 * (x + rect.w as f64) - width) / width;
    let y1 = (height - 2.0 * y) / height;
    let y2 = (height - 2.0 * (y + rect.h as f64)) / height;

    Quad([
        x1 as f32, y1 as f32, // top left
        x1 as f32, y2 as f32, // bottom left
        x2 as f32, y1 as f32, // top right
        x2 as f32, y2 as f32, // bottom right
    ])
}
