//! Tessera Frame
//!
//! The media primitives the mixer is built on:
//! - **Frames:** owned planar YUV 4:2:0 (and packed RGB) buffers with
//!   copy, clear, and blit
//! - **Allocation:** a pluggable allocator with a size ceiling
//! - **Resampling:** nearest/bilinear scaling with RGB to YUV conversion
//! - **Fan-out:** producer/consumer traits and a reusable publisher
//!
//! Nothing here spawns threads; every operation runs on the caller's thread.

pub mod allocator;
pub mod format;
pub mod frame;
pub mod pattern;
pub mod publisher;
pub mod scaler;

pub use allocator::{FrameAllocator, HeapAllocator};
pub use format::PixelFormat;
pub use frame::{VideoFrame, YUV_BLACK};
pub use pattern::{PatternColor, TestPatternSource};
pub use publisher::{FrameConsumer, FrameProducer, FramePublisher, SourceId};
pub use scaler::{Resampler, Scaler};
