//! Synthetic frame producer.
//!
//! Publishes solid-colour frames, optionally with a vertical bar that moves
//! one step per frame so motion is visible in the composite.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tessera_common::error::TesseraResult;

use crate::format::PixelFormat;
use crate::frame::VideoFrame;
use crate::publisher::{FrameConsumer, FrameProducer, FramePublisher, SourceId};

/// Colour of a pattern, in the pattern's pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternColor {
    Yuv([u8; 3]),
    Rgb([u8; 3]),
}

/// A producer emitting frames of fixed geometry on demand.
#[derive(Debug)]
pub struct TestPatternSource {
    publisher: FramePublisher,
    width: u32,
    height: u32,
    color: Mutex<PatternColor>,
    moving_bar: bool,
    frames_emitted: AtomicU64,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32, color: PatternColor) -> Self {
        Self {
            publisher: FramePublisher::new(),
            width,
            height,
            color: Mutex::new(color),
            moving_bar: false,
            frames_emitted: AtomicU64::new(0),
        }
    }

    /// Draw a white bar sweeping left to right (YUV patterns only).
    pub fn with_moving_bar(mut self) -> Self {
        self.moving_bar = true;
        self
    }

    pub fn set_color(&self, color: PatternColor) {
        *self.color.lock().unwrap_or_else(PoisonError::into_inner) = color;
    }

    pub fn format(&self) -> PixelFormat {
        match *self.color.lock().unwrap_or_else(PoisonError::into_inner) {
            PatternColor::Yuv(_) => PixelFormat::Yuv420p,
            PatternColor::Rgb(_) => PixelFormat::Rgb24,
        }
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted.load(Ordering::Relaxed)
    }

    /// Render and publish the next frame to all attached consumers.
    pub fn emit(&self) -> TesseraResult<()> {
        let color = *self.color.lock().unwrap_or_else(PoisonError::into_inner);
        let index = self.frames_emitted.fetch_add(1, Ordering::Relaxed);

        let frame = match color {
            PatternColor::Yuv(yuv) => {
                let mut frame = VideoFrame::solid_yuv(self.width, self.height, yuv)?;
                if self.moving_bar {
                    let bar_width = (self.width / 16).max(2);
                    let x = (index * u64::from(bar_width) % u64::from(self.width)) as u32;
                    frame.fill_rect_yuv(x, 0, bar_width, self.height, [235, 128, 128])?;
                }
                frame
            }
            PatternColor::Rgb(rgb) => VideoFrame::solid_rgb(self.width, self.height, rgb)?,
        };

        self.publisher.publish(frame);
        Ok(())
    }

    /// Last frame this source published.
    pub fn last_frame(&self) -> Option<Arc<VideoFrame>> {
        self.publisher.last_frame()
    }
}

impl FrameProducer for TestPatternSource {
    fn source_id(&self) -> SourceId {
        self.publisher.id()
    }

    fn attach(&self, consumer: &Arc<dyn FrameConsumer>) -> bool {
        self.publisher.attach(consumer)
    }

    fn detach(&self, consumer: &dyn FrameConsumer) -> bool {
        self.publisher.detach(consumer)
    }
}
