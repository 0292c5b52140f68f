//! Pixel formats and plane geometry.

use serde::{Deserialize, Serialize};

/// Pixel layout of a [`VideoFrame`](crate::VideoFrame) buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Planar YUV 4:2:0 (I420): full-size Y, quarter-size U and V planes.
    Yuv420p,
    /// Packed 8-bit RGB, one plane.
    Rgb24,
}

impl PixelFormat {
    /// Number of planes in the buffer.
    pub fn plane_count(self) -> usize {
        match self {
            PixelFormat::Yuv420p => 3,
            PixelFormat::Rgb24 => 1,
        }
    }

    /// `(row_bytes, rows)` of plane `plane` for a `width` x `height` frame.
    ///
    /// Chroma planes round up so odd dimensions keep their last column/row.
    pub fn plane_dims(self, plane: usize, width: u32, height: u32) -> (usize, usize) {
        let (w, h) = (width as usize, height as usize);
        match (self, plane) {
            (PixelFormat::Yuv420p, 0) => (w, h),
            (PixelFormat::Yuv420p, _) => (w.div_ceil(2), h.div_ceil(2)),
            (PixelFormat::Rgb24, _) => (w * 3, h),
        }
    }

    /// Total buffer size in bytes, or `None` on overflow.
    pub fn buffer_size(self, width: u32, height: u32) -> Option<usize> {
        (0..self.plane_count()).try_fold(0usize, |acc, plane| {
            let (row, rows) = self.plane_dims(plane, width, height);
            row.checked_mul(rows).and_then(|n| acc.checked_add(n))
        })
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Yuv420p => f.write_str("yuv420p"),
            PixelFormat::Rgb24 => f.write_str("rgb24"),
        }
    }
}
