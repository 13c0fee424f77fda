//! Automatic grid placement.
//!
//! Sources without a caller-supplied rectangle are arranged in a
//! square-ish grid whose density depends on the total number of visual
//! sources: `n` sources use a `ceil(sqrt(n))` wide grid, filled row by row.

use crate::geometry::{Rect, Size};

/// Number of rows and columns of the grid holding `count` sources.
pub fn grid_size(count: usize) -> usize {
    let mut size = 1;
    while size * size < count {
        size += 1;
    }
    size
}

/// Dimensions of one grid cell for the given grid size.
pub fn cell_size(canvas: Size, grid: usize) -> (u32, u32) {
    let grid = grid.max(1) as u32;
    (canvas.width / grid, canvas.height / grid)
}

/// Rectangle of slot `slot` when `count` sources share the canvas.
pub fn grid_slot(slot: usize, count: usize, canvas: Size) -> Rect {
    let grid = grid_size(count.max(slot + 1));
    let (w, h) = cell_size(canvas, grid);
    let row = (slot / grid) as u64;
    let col = (slot % grid) as u64;
    Rect::new(to_coord(col * w as u64), to_coord(row * h as u64), w, h)
}

fn to_coord(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Rectangles for slots `0..count`.
pub fn grid_layout(count: usize, canvas: Size) -> Vec<Rect> {
    (0..count).map(|slot| grid_slot(slot, count, canvas)).collect()
}
