//! Grid layout: maps a source count and canvas size to per-slot geometry.
//!
//! Sources are packed into the smallest square grid that holds them
//! (`zoom = ceil(sqrt(n))`), filled row by row. Cells use integer division,
//! so up to `zoom - 1` pixels on the right and bottom edges belong to no
//! cell.

use serde::Serialize;

/// Side length of the smallest square grid holding `n` slots.
///
/// Returns 0 for `n == 0`.
pub fn grid_zoom(n: usize) -> usize {
    // A square that overflows usize holds every n.
    let square_holds = |side: usize| side.checked_mul(side).map_or(true, |sq| sq >= n);

    let mut zoom = (n as f64).sqrt() as usize;
    while !square_holds(zoom) {
        zoom += 1;
    }
    while zoom > 0 && square_holds(zoom - 1) {
        zoom -= 1;
    }
    zoom
}

/// Cell geometry for one source count on one canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    pub zoom: u32,
    pub cell_width: u32,
    pub cell_height: u32,
}

/// Pixel rectangle of one slot on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl GridLayout {
    /// Compute the grid, or `None` when there is nothing to lay out.
    pub fn compute(source_count: usize, canvas_width: u32, canvas_height: u32) -> Option<Self> {
        if source_count == 0 {
            return None;
        }
        let zoom = u32::try_from(grid_zoom(source_count)).ok()?;
        Some(Self {
            zoom,
            cell_width: canvas_width / zoom,
            cell_height: canvas_height / zoom,
        })
    }

    /// Number of slots the grid holds.
    pub fn capacity(&self) -> usize {
        (self.zoom as usize) * (self.zoom as usize)
    }

    /// Rectangle for slot `index`, row-major.
    pub fn slot(&self, index: usize) -> SlotRect {
        let zoom = self.zoom as usize;
        let column = (index % zoom) as u32;
        let row = u32::try_from(index / zoom).unwrap_or(u32::MAX);
        SlotRect {
            x: column * self.cell_width,
            y: row.saturating_mul(self.cell_height),
            width: self.cell_width,
            height: self.cell_height,
        }
    }
}
