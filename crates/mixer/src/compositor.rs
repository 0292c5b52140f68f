//! Incremental grid compositor.
//!
//! Each arriving frame updates exactly one slot: the previous composite is
//! copied forward as the baseline, the input is resampled into its cell,
//! and the result is published. Slots whose source has not sent a frame
//! since keep their previous content.

use std::sync::Arc;

use serde::Serialize;
use tessera_common::error::{TesseraError, TesseraResult};
use tessera_frame::{FrameAllocator, FramePublisher, PixelFormat, Resampler, VideoFrame};

use crate::layout::GridLayout;

/// Output pixel format for the canvas and every slot.
pub const CANVAS_FORMAT: PixelFormat = PixelFormat::Yuv420p;

/// Canvas geometry. `0x0` means unconfigured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Canvas {
    width: u32,
    height: u32,
}

impl Canvas {
    pub const UNCONFIGURED: Canvas = Canvas {
        width: 0,
        height: 0,
    };

    /// Validate a geometry: both sides zero, or both positive.
    pub fn new(width: u32, height: u32) -> TesseraResult<Self> {
        if (width == 0) != (height == 0) {
            return Err(TesseraError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_configured(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Why a frame was dropped without rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unconfigured,
    NoSources,
}

/// Result of one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Published,
    Skipped(SkipReason),
}

/// Renders one source frame into its slot of the shared canvas.
pub struct Compositor {
    allocator: Arc<dyn FrameAllocator>,
    resampler: Box<dyn Resampler>,
}

impl Compositor {
    pub fn new(allocator: Arc<dyn FrameAllocator>, resampler: Box<dyn Resampler>) -> Self {
        Self {
            allocator,
            resampler,
        }
    }

    /// Render `input` into slot `slot` of a grid sized for `source_count`
    /// sources, and publish the composite through `output`.
    ///
    /// Nothing is published unless every step succeeds; on error the
    /// previous composite stays in place.
    pub fn render(
        &self,
        input: &VideoFrame,
        slot: usize,
        source_count: usize,
        canvas: Canvas,
        output: &FramePublisher,
    ) -> TesseraResult<RenderOutcome> {
        if !canvas.is_configured() {
            return Ok(RenderOutcome::Skipped(SkipReason::Unconfigured));
        }
        let Some(layout) = GridLayout::compute(source_count, canvas.width, canvas.height) else {
            return Ok(RenderOutcome::Skipped(SkipReason::NoSources));
        };

        let mut composite = self
            .allocator
            .allocate(canvas.width, canvas.height, CANVAS_FORMAT)?;

        if let Some(previous) = output.last_frame() {
            if previous.same_layout(&composite) {
                previous.copy_into(&mut composite)?;
            } else {
                tracing::trace!(
                    previous_width = previous.width(),
                    previous_height = previous.height(),
                    "Baseline geometry differs from canvas; starting blank"
                );
            }
        }

        let cell = layout.slot(slot);
        let mut scaled = self
            .allocator
            .allocate(cell.width, cell.height, CANVAS_FORMAT)?;
        self.resampler.scale(input, &mut scaled)?;
        composite.blit(&scaled, cell.x, cell.y)?;

        output.publish(composite);
        Ok(RenderOutcome::Published)
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tessera_common::config::ScalingAlgorithm;
    use tessera_frame::{HeapAllocator, Scaler};

    use super::*;

    fn compositor() -> Compositor {
        Compositor::new(
            Arc::new(HeapAllocator::default()),
            Box::new(Scaler::new(ScalingAlgorithm::Nearest)),
        )
    }

    fn canvas(width: u32, height: u32) -> Canvas {
        Canvas::new(width, height).unwrap()
    }

    #[test]
    fn test_canvas_rejects_half_configured_geometry() {
        assert!(Canvas::new(640, 0).is_err());
        assert!(Canvas::new(0, 480).is_err());
        assert!(!Canvas::new(0, 0).unwrap().is_configured());
        assert!(canvas(640, 480).is_configured());
    }

    #[test]
    fn test_unconfigured_canvas_skips() {
        let output = FramePublisher::new();
        let input = VideoFrame::solid_yuv(8, 8, [200, 128, 128]).unwrap();
        let outcome = compositor()
            .render(&input, 0, 1, Canvas::UNCONFIGURED, &output)
            .unwrap();
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::Unconfigured));
        assert!(output.last_frame().is_none());
    }

    #[test]
    fn test_zero_sources_skip_before_layout() {
        let output = FramePublisher::new();
        let input = VideoFrame::solid_yuv(8, 8, [200, 128, 128]).unwrap();
        let outcome = compositor()
            .render(&input, 0, 0, canvas(64, 48), &output)
            .unwrap();
        assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::NoSources));
        assert!(output.last_frame().is_none());
    }

    #[test]
    fn test_slot_is_rendered_at_grid_offset() {
        let output = FramePublisher::new();
        let input = VideoFrame::solid_yuv(10, 10, [235, 128, 128]).unwrap();
        compositor()
            .render(&input, 3, 4, canvas(64, 48), &output)
            .unwrap();

        let composite = output.last_frame().unwrap();
        assert_eq!(composite.luma_at(32, 24), Some(235));
        assert_eq!(composite.luma_at(63, 47), Some(235));
        assert_eq!(composite.luma_at(31, 23), Some(16));
    }

    #[test]
    fn test_previous_composite_is_carried_forward() {
        let output = FramePublisher::new();
        let compositor = compositor();
        let a = VideoFrame::solid_yuv(8, 8, [100, 128, 128]).unwrap();
        let b = VideoFrame::solid_yuv(8, 8, [200, 128, 128]).unwrap();

        compositor.render(&a, 0, 2, canvas(64, 64), &output).unwrap();
        compositor.render(&b, 1, 2, canvas(64, 64), &output).unwrap();

        let composite = output.last_frame().unwrap();
        assert_eq!(composite.luma_at(0, 0), Some(100));
        assert_eq!(composite.luma_at(32, 0), Some(200));
    }

    #[test]
    fn test_stale_baseline_of_other_size_is_ignored() {
        let output = FramePublisher::new();
        output.publish(VideoFrame::solid_yuv(32, 32, [200, 128, 128]).unwrap());

        let input = VideoFrame::solid_yuv(8, 8, [90, 128, 128]).unwrap();
        compositor()
            .render(&input, 0, 4, canvas(64, 64), &output)
            .unwrap();

        let composite = output.last_frame().unwrap();
        assert_eq!(composite.luma_at(0, 0), Some(90));
        assert_eq!(composite.luma_at(40, 40), Some(16));
    }

    #[test]
    fn test_scratch_allocation_failure_publishes_nothing() {
        let output = FramePublisher::new();
        let input = VideoFrame::solid_yuv(8, 8, [90, 128, 128]).unwrap();
        // Two sources on a 1-pixel-wide canvas leave a zero-width cell.
        let err = compositor()
            .render(&input, 0, 2, canvas(1, 64), &output)
            .unwrap_err();
        assert!(err.is_allocation());
        assert!(output.last_frame().is_none());
    }
}
