//! Owned planar video frame.

use tessera_common::error::{TesseraError, TesseraResult};

use crate::format::PixelFormat;

/// Black in limited-range BT.601 YUV.
pub const YUV_BLACK: [u8; 3] = [16, 128, 128];

/// A single video frame: geometry, pixel format, and an owned pixel buffer.
///
/// Planes are stored back to back with no row padding, so the stride of a
/// plane equals its row width in bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl VideoFrame {
    /// Allocate a cleared frame.
    ///
    /// Fails (without aborting the process) when either side is zero, the
    /// size overflows, or the system cannot provide the buffer.
    pub fn allocate(width: u32, height: u32, format: PixelFormat) -> TesseraResult<Self> {
        if width == 0 || height == 0 {
            return Err(TesseraError::allocation(format!(
                "Cannot allocate empty {format} frame {width}x{height}"
            )));
        }
        let size = format.buffer_size(width, height).ok_or_else(|| {
            TesseraError::allocation(format!("Frame size overflow for {width}x{height}"))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(size).map_err(|e| {
            TesseraError::allocation(format!(
                "Failed to reserve {size} bytes for {width}x{height} {format} frame: {e}"
            ))
        })?;
        data.resize(size, 0);

        let mut frame = Self {
            width,
            height,
            format,
            data,
        };
        frame.clear();
        Ok(frame)
    }

    /// Allocate a YUV 4:2:0 frame filled with one colour.
    pub fn solid_yuv(width: u32, height: u32, yuv: [u8; 3]) -> TesseraResult<Self> {
        let mut frame = Self::allocate(width, height, PixelFormat::Yuv420p)?;
        frame.fill_yuv(yuv)?;
        Ok(frame)
    }

    /// Allocate an RGB frame filled with one colour.
    pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> TesseraResult<Self> {
        let mut frame = Self::allocate(width, height, PixelFormat::Rgb24)?;
        for px in frame.data.chunks_exact_mut(3) {
            px.copy_from_slice(&rgb);
        }
        Ok(frame)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Whole buffer, planes concatenated.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Row width in bytes of `plane`.
    pub fn stride(&self, plane: usize) -> usize {
        self.format.plane_dims(plane, self.width, self.height).0
    }

    /// Read-only view of one plane.
    pub fn plane(&self, plane: usize) -> &[u8] {
        let range = self.plane_range(plane);
        &self.data[range]
    }

    /// Mutable view of one plane.
    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        let range = self.plane_range(plane);
        &mut self.data[range]
    }

    fn plane_range(&self, plane: usize) -> std::ops::Range<usize> {
        assert!(
            plane < self.format.plane_count(),
            "plane {plane} out of range for {}",
            self.format
        );
        let start = (0..plane)
            .map(|p| {
                let (row, rows) = self.format.plane_dims(p, self.width, self.height);
                row * rows
            })
            .sum::<usize>();
        let (row, rows) = self.format.plane_dims(plane, self.width, self.height);
        start..start + row * rows
    }

    /// Copy this frame's full contents into `dst`.
    ///
    /// Both frames must share geometry and format.
    pub fn copy_into(&self, dst: &mut VideoFrame) -> TesseraResult<()> {
        if !self.same_layout(dst) {
            return Err(TesseraError::format(format!(
                "Cannot copy {}x{} {} into {}x{} {}",
                self.width, self.height, self.format, dst.width, dst.height, dst.format
            )));
        }
        dst.data.copy_from_slice(&self.data);
        Ok(())
    }

    /// Whether `other` has the same width, height, and format.
    pub fn same_layout(&self, other: &VideoFrame) -> bool {
        self.width == other.width && self.height == other.height && self.format == other.format
    }

    /// Reset to black.
    pub fn clear(&mut self) {
        match self.format {
            PixelFormat::Yuv420p => {
                // Infallible: format was just checked.
                let _ = self.fill_yuv(YUV_BLACK);
            }
            PixelFormat::Rgb24 => self.data.fill(0),
        }
    }

    /// Fill every pixel of a YUV 4:2:0 frame with one colour.
    pub fn fill_yuv(&mut self, yuv: [u8; 3]) -> TesseraResult<()> {
        self.expect_yuv("fill")?;
        for (plane, value) in yuv.iter().enumerate() {
            self.plane_mut(plane).fill(*value);
        }
        Ok(())
    }

    /// Paint a filled rectangle, clipped to the frame.
    pub fn fill_rect_yuv(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        yuv: [u8; 3],
    ) -> TesseraResult<()> {
        self.expect_yuv("fill_rect")?;
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        if x >= x_end || y >= y_end {
            return Ok(());
        }
        for (plane, value) in yuv.iter().enumerate() {
            let shift = u32::from(plane > 0);
            let (x0, x1) = ((x >> shift) as usize, (x_end.div_ceil(1 << shift)) as usize);
            let (y0, y1) = ((y >> shift) as usize, (y_end.div_ceil(1 << shift)) as usize);
            let stride = self.stride(plane);
            let buf = self.plane_mut(plane);
            for row in y0..y1 {
                buf[row * stride + x0..row * stride + x1].fill(*value);
            }
        }
        Ok(())
    }

    /// Copy `src` onto this frame with its top-left corner at `(x, y)`.
    ///
    /// The parts of `src` falling outside this frame are clipped. Only the
    /// chroma samples whose 2x2 block starts at or after `(x, y)` are written,
    /// so at an odd offset the first source chroma column (or row) is skipped
    /// and the block shared with the left (or upper) neighbour is left alone.
    pub fn blit(&mut self, src: &VideoFrame, x: u32, y: u32) -> TesseraResult<()> {
        self.expect_yuv("blit")?;
        if src.format != self.format {
            return Err(TesseraError::format(format!(
                "Cannot blit {} onto {}",
                src.format, self.format
            )));
        }

        for plane in 0..self.format.plane_count() {
            let step = if plane > 0 { 2 } else { 1 };
            let (dst_x, dst_y) = (x.div_ceil(step) as usize, y.div_ceil(step) as usize);
            let skip_x = dst_x - (x / step) as usize;
            let skip_y = dst_y - (y / step) as usize;
            let (dst_row_len, dst_rows) = self.format.plane_dims(plane, self.width, self.height);
            let (src_row_len, src_rows) = src.format.plane_dims(plane, src.width, src.height);
            if dst_x >= dst_row_len
                || dst_y >= dst_rows
                || skip_x >= src_row_len
                || skip_y >= src_rows
            {
                continue;
            }

            let copy_len = (src_row_len - skip_x).min(dst_row_len - dst_x);
            let copy_rows = (src_rows - skip_y).min(dst_rows - dst_y);
            let src_plane = src.plane(plane);
            let dst_plane = self.plane_mut(plane);
            for row in 0..copy_rows {
                let s = (skip_y + row) * src_row_len + skip_x;
                let d = (dst_y + row) * dst_row_len + dst_x;
                dst_plane[d..d + copy_len].copy_from_slice(&src_plane[s..s + copy_len]);
            }
        }
        Ok(())
    }

    /// Luma sample at pixel `(x, y)` of a YUV frame.
    pub fn luma_at(&self, x: u32, y: u32) -> Option<u8> {
        if self.format != PixelFormat::Yuv420p || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.plane(0)[y as usize * self.stride(0) + x as usize])
    }

    /// `(u, v)` chroma samples covering pixel `(x, y)` of a YUV frame.
    pub fn chroma_at(&self, x: u32, y: u32) -> Option<(u8, u8)> {
        if self.format != PixelFormat::Yuv420p || x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y / 2) as usize * self.stride(1) + (x / 2) as usize;
        Some((self.plane(1)[idx], self.plane(2)[idx]))
    }

    fn expect_yuv(&self, op: &str) -> TesseraResult<()> {
        if self.format == PixelFormat::Yuv420p {
            Ok(())
        } else {
            Err(TesseraError::format(format!(
                "{op} requires yuv420p, frame is {}",
                self.format
            )))
        }
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}
