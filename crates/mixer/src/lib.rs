//! Tessera Mixer
//!
//! Real-time grid mixer: every attached source owns one cell of a square
//! grid, and each arriving frame repaints only its own cell on top of the
//! previous composite.
//!
//! # Data Flow
//!
//! ```text
//! preview ───┐
//! remote A ──┼── on_frame ── slot lookup ── Compositor ── FramePublisher ──┬── sink
//! remote B ──┘   (registry)   (layout)      (scale+blit)   (last frame)     └── other consumers
//! ```
//!
//! Geometry changes go through [`VideoMixer::set_dimensions`], which blanks
//! the baseline and restarts the sink.

pub mod compositor;
pub mod controls;
pub mod layout;
pub mod mixer;
pub mod registry;
pub mod sink;
pub mod stats;

pub use compositor::{Canvas, Compositor, RenderOutcome, SkipReason, CANVAS_FORMAT};
pub use controls::{DecodingEvent, LocalControls, VideoControls};
pub use layout::{grid_zoom, GridLayout, SlotRect};
pub use mixer::VideoMixer;
pub use registry::SourceRegistry;
pub use sink::{SinkController, SinkEndpoint, SinkState};
pub use stats::{MixerStats, MixerStatsSnapshot};
