#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tessera_common::config::{MixerDefaults, ScalingAlgorithm};
use tessera_common::error::{TesseraError, TesseraResult};
use tessera_frame::{
    FrameAllocator, FrameConsumer, HeapAllocator, PatternColor, PixelFormat, SourceId,
    TestPatternSource, VideoFrame,
};
use tessera_mixer::{LocalControls, SinkEndpoint, VideoMixer};

pub const MIXER_ID: &str = "call-1";

/// Sink that keeps every frame it receives.
pub struct MemorySink {
    name: String,
    pub refuse_start: AtomicBool,
    pub starts: AtomicU32,
    pub stops: AtomicU32,
    frames: Mutex<Vec<Arc<VideoFrame>>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refuse_start: AtomicBool::new(false),
            starts: AtomicU32::new(0),
            stops: AtomicU32::new(0),
            frames: Mutex::new(Vec::new()),
        }
    }

    pub fn frames(&self) -> Vec<Arc<VideoFrame>> {
        self.frames.lock().unwrap().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl FrameConsumer for MemorySink {
    fn on_frame(&self, _source: SourceId, frame: &Arc<VideoFrame>) {
        self.frames.lock().unwrap().push(Arc::clone(frame));
    }
}

impl SinkEndpoint for MemorySink {
    fn start(&self) -> TesseraResult<()> {
        if self.refuse_start.load(Ordering::SeqCst) {
            return Err(TesseraError::sink(format!("{} refused to open", self.name)));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn opened_name(&self) -> String {
        self.name.clone()
    }
}

/// Heap allocator that can be switched into failing mode.
#[derive(Default)]
pub struct SwitchableAllocator {
    inner: HeapAllocator,
    pub fail: AtomicBool,
}

impl FrameAllocator for SwitchableAllocator {
    fn allocate(&self, width: u32, height: u32, format: PixelFormat) -> TesseraResult<VideoFrame> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TesseraError::allocation("allocation disabled by test"));
        }
        self.inner.allocate(width, height, format)
    }
}

/// A mixer wired to in-memory collaborators.
pub struct Harness {
    pub preview: Arc<TestPatternSource>,
    pub controls: Arc<LocalControls>,
    pub sink: Arc<MemorySink>,
    pub allocator: Arc<SwitchableAllocator>,
    pub mixer: Arc<VideoMixer>,
}

impl Harness {
    /// Mixer with a 16x16 preview of luma `preview_luma`, nearest-neighbour
    /// scaling and an unconfigured canvas.
    pub fn new(preview_luma: u8) -> Self {
        tessera_common::logging::init_default_logging();
        let preview = Arc::new(pattern(preview_luma));
        let controls = Arc::new(LocalControls::new(preview.clone()));
        let config = MixerDefaults {
            scaling: ScalingAlgorithm::Nearest,
            ..MixerDefaults::default()
        };
        let sink = Arc::new(MemorySink::new(config.sink_name(MIXER_ID)));
        let allocator = Arc::new(SwitchableAllocator::default());
        let mixer = VideoMixer::with_allocator(
            MIXER_ID,
            &config,
            controls.clone(),
            sink.clone(),
            allocator.clone(),
        )
        .expect("mixer should build");

        Self {
            preview,
            controls,
            sink,
            allocator,
            mixer,
        }
    }

    /// Create a remote pattern source and attach it to the mixer.
    pub fn remote(&self, luma: u8) -> Arc<TestPatternSource> {
        let source = Arc::new(pattern(luma));
        assert!(self.mixer.attach_source(&*source));
        source
    }
}

/// 16x16 solid grey-level source.
pub fn pattern(luma: u8) -> TestPatternSource {
    TestPatternSource::new(16, 16, PatternColor::Yuv([luma, 128, 128]))
}

/// 16x16 solid source with equal chroma planes.
pub fn tinted(luma: u8, chroma: u8) -> TestPatternSource {
    TestPatternSource::new(16, 16, PatternColor::Yuv([luma, chroma, chroma]))
}
