//! The mixer node.
//!
//! A [`VideoMixer`] consumes frames from every attached source and produces
//! one composite stream. All registry changes, geometry changes and renders
//! are serialized behind a single lock and run synchronously on the calling
//! thread.
//!
//! Consumers of the composite (including the sink) are called while that
//! lock is held, so they must not call back into the mixer from `on_frame`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tessera_common::config::MixerDefaults;
use tessera_common::error::{TesseraError, TesseraResult};
use tessera_frame::{
    FrameAllocator, FrameConsumer, FrameProducer, FramePublisher, HeapAllocator, PixelFormat,
    Scaler, SourceId, VideoFrame,
};

use crate::compositor::{Canvas, Compositor, RenderOutcome, CANVAS_FORMAT};
use crate::controls::VideoControls;
use crate::registry::SourceRegistry;
use crate::sink::{SinkController, SinkEndpoint, SinkState};
use crate::stats::{MixerStats, MixerStatsSnapshot};

/// Everything guarded by the mixer lock.
#[derive(Debug)]
struct MixerState {
    canvas: Canvas,
    sources: SourceRegistry,
    sink: SinkController,
}

/// Composites N live sources onto a grid canvas and publishes the result.
pub struct VideoMixer {
    id: String,
    preview: Arc<dyn FrameProducer>,
    state: Mutex<MixerState>,
    output: FramePublisher,
    compositor: Compositor,
    stats: MixerStats,
}

impl VideoMixer {
    /// Create a mixer with a heap allocator bounded by
    /// `config.max_frame_bytes`.
    ///
    /// The local preview is started if needed and attached as the first
    /// source. If `config` carries a canvas geometry it is applied, which
    /// also starts the sink; otherwise the sink stays stopped until the
    /// first [`set_dimensions`](Self::set_dimensions).
    pub fn new<S: SinkEndpoint + 'static>(
        id: impl Into<String>,
        config: &MixerDefaults,
        controls: Arc<dyn VideoControls>,
        sink: Arc<S>,
    ) -> TesseraResult<Arc<Self>> {
        let allocator = Arc::new(HeapAllocator::new(config.max_frame_bytes));
        Self::with_allocator(id, config, controls, sink, allocator)
    }

    /// Like [`new`](Self::new) with a caller-supplied frame allocator.
    pub fn with_allocator<S: SinkEndpoint + 'static>(
        id: impl Into<String>,
        config: &MixerDefaults,
        controls: Arc<dyn VideoControls>,
        sink: Arc<S>,
        allocator: Arc<dyn FrameAllocator>,
    ) -> TesseraResult<Arc<Self>> {
        let id = id.into();
        let initial = Canvas::new(config.canvas_width, config.canvas_height)?;

        if !controls.has_preview_started() {
            controls.start_preview()?;
        }
        let preview = controls
            .video_preview()
            .ok_or_else(|| TesseraError::control("local preview unavailable after start"))?;

        let mixer = Arc::new(Self {
            state: Mutex::new(MixerState {
                canvas: Canvas::UNCONFIGURED,
                sources: SourceRegistry::new(),
                sink: SinkController::new(sink, controls, id.clone()),
            }),
            compositor: Compositor::new(allocator, Box::new(Scaler::new(config.scaling))),
            output: FramePublisher::new(),
            stats: MixerStats::default(),
            preview,
            id,
        });

        let consumer: Arc<dyn FrameConsumer> = mixer.clone();
        mixer.preview.attach(&consumer);
        tracing::info!(
            mixer = %mixer.id,
            preview = %mixer.preview.source_id(),
            "Mixer created"
        );

        if initial.is_configured() {
            mixer.set_dimensions(initial.width(), initial.height())?;
        }
        Ok(mixer)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribe this mixer to `source`. The source takes the next free
    /// slot. Returns `false` if it was already subscribed.
    pub fn attach_source(self: &Arc<Self>, source: &dyn FrameProducer) -> bool {
        let consumer: Arc<dyn FrameConsumer> = self.clone();
        source.attach(&consumer)
    }

    /// Unsubscribe this mixer from `source`. Later sources shift one slot
    /// back.
    pub fn detach_source(&self, source: &dyn FrameProducer) -> bool {
        source.detach(self)
    }

    /// Change the canvas geometry.
    ///
    /// The last composite is blanked so the next render starts from a clean
    /// baseline, then the sink is stopped and restarted against the new
    /// geometry. `0x0` unconfigures the canvas; a geometry with exactly one
    /// zero side is rejected and nothing changes.
    pub fn set_dimensions(&self, width: u32, height: u32) -> TesseraResult<()> {
        let canvas = Canvas::new(width, height)?;

        let mut state = self.lock_state();
        state.canvas = canvas;
        self.output.clear_last();

        let started = state.sink.restart(&self.output, width, height);
        self.stats.inc_sink_restarts();
        if !started {
            self.stats.inc_sink_start_failures();
        }

        tracing::info!(mixer = %self.id, width, height, sink_started = started, "Canvas resized");
        Ok(())
    }

    pub fn canvas(&self) -> Canvas {
        self.lock_state().canvas
    }

    pub fn width(&self) -> u32 {
        self.canvas().width()
    }

    pub fn height(&self) -> u32 {
        self.canvas().height()
    }

    pub fn pixel_format(&self) -> PixelFormat {
        CANVAS_FORMAT
    }

    /// Number of registry entries, including the local preview.
    pub fn source_count(&self) -> usize {
        self.lock_state().sources.len()
    }

    /// Attached sources in slot order.
    pub fn sources(&self) -> Vec<SourceId> {
        self.lock_state().sources.iter().collect()
    }

    /// The most recent composite.
    pub fn last_frame(&self) -> Option<Arc<VideoFrame>> {
        self.output.last_frame()
    }

    pub fn sink_state(&self) -> SinkState {
        self.lock_state().sink.state()
    }

    pub fn stats(&self) -> MixerStatsSnapshot {
        self.stats.snapshot()
    }

    fn lock_state(&self) -> MutexGuard<'_, MixerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FrameConsumer for VideoMixer {
    fn on_frame(&self, source: SourceId, frame: &Arc<VideoFrame>) {
        self.stats.inc_received();
        let state = self.lock_state();

        let slot = state.sources.index_of(source).unwrap_or_else(|| {
            tracing::trace!(
                mixer = %self.id,
                %source,
                "Frame from unregistered source, using slot 0"
            );
            0
        });

        match self.compositor.render(
            frame,
            slot,
            state.sources.len(),
            state.canvas,
            &self.output,
        ) {
            Ok(RenderOutcome::Published) => self.stats.inc_published(),
            Ok(RenderOutcome::Skipped(reason)) => {
                tracing::trace!(mixer = %self.id, %source, ?reason, "Frame dropped");
                self.stats.inc_skipped();
            }
            Err(e) => {
                tracing::error!(
                    mixer = %self.id,
                    %source,
                    slot,
                    error = %e,
                    "Render failed, keeping previous composite"
                );
                self.stats.inc_failed();
            }
        }
    }

    fn attached(&self, source: SourceId) {
        let mut state = self.lock_state();
        state.sources.attach(source);
        tracing::debug!(mixer = %self.id, %source, sources = state.sources.len(), "Source attached");
    }

    fn detached(&self, source: SourceId) {
        let mut state = self.lock_state();
        state.sources.detach(source);
        tracing::debug!(mixer = %self.id, %source, sources = state.sources.len(), "Source detached");
        if state.sources.is_empty() {
            tracing::info!(mixer = %self.id, "No sources left, frames will be dropped");
        }
    }
}

impl FrameProducer for VideoMixer {
    fn source_id(&self) -> SourceId {
        self.output.id()
    }

    fn attach(&self, consumer: &Arc<dyn FrameConsumer>) -> bool {
        self.output.attach(consumer)
    }

    fn detach(&self, consumer: &dyn FrameConsumer) -> bool {
        self.output.detach(consumer)
    }
}

impl Drop for VideoMixer {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.sink.stop(&self.output);
        self.preview.detach(&*self);
        tracing::info!(mixer = %self.id, "Mixer destroyed");
    }
}

impl std::fmt::Debug for VideoMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoMixer")
            .field("id", &self.id)
            .field("output", &self.output.id())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
