//! Frame allocation.
//!
//! The mixer never calls [`VideoFrame::allocate`] directly; it goes through
//! a [`FrameAllocator`] so hosts can cap memory use (and tests can force
//! failures).

use tessera_common::error::{TesseraError, TesseraResult};

use crate::format::PixelFormat;
use crate::frame::VideoFrame;

/// Source of fresh, writable frames.
pub trait FrameAllocator: Send + Sync {
    /// Allocate a cleared frame. Failure is returned, never panicked.
    fn allocate(&self, width: u32, height: u32, format: PixelFormat) -> TesseraResult<VideoFrame>;
}

/// Heap allocator with a per-frame size ceiling.
#[derive(Debug, Clone)]
pub struct HeapAllocator {
    max_bytes: usize,
}

impl HeapAllocator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new(tessera_common::config::MixerDefaults::default().max_frame_bytes)
    }
}

impl FrameAllocator for HeapAllocator {
    fn allocate(&self, width: u32, height: u32, format: PixelFormat) -> TesseraResult<VideoFrame> {
        let size = format.buffer_size(width, height).ok_or_else(|| {
            TesseraError::allocation(format!("Frame size overflow for {width}x{height}"))
        })?;
        if size > self.max_bytes {
            tracing::debug!(width, height, size, limit = self.max_bytes, "Frame over ceiling");
            return Err(TesseraError::allocation(format!(
                "{width}x{height} {format} frame needs {size} bytes, limit is {}",
                self.max_bytes
            )));
        }
        VideoFrame::allocate(width, height, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_is_enforced() {
        let allocator = HeapAllocator::new(1000);
        assert!(allocator.allocate(20, 20, PixelFormat::Yuv420p).is_ok());

        let err = allocator
            .allocate(40, 40, PixelFormat::Yuv420p)
            .unwrap_err();
        assert!(err.is_allocation());
        assert!(err.to_string().contains("limit is 1000"));
    }

    #[test]
    fn test_zero_sized_cell_fails() {
        let allocator = HeapAllocator::default();
        assert!(allocator.allocate(0, 0, PixelFormat::Yuv420p).is_err());
    }
}
