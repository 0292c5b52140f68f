//! Control surface contract.
//!
//! The mixer reaches the call layer only through [`VideoControls`], handed
//! in at construction. [`LocalControls`] is an in-process implementation
//! backed by a caller-supplied preview producer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tessera_common::error::TesseraResult;
use tessera_frame::FrameProducer;

/// Preview management and decode lifecycle notifications.
pub trait VideoControls: Send + Sync {
    /// Whether the local capture preview is running.
    fn has_preview_started(&self) -> bool;

    /// Start the local capture preview.
    fn start_preview(&self) -> TesseraResult<()>;

    /// The local capture producer, if the preview is running.
    fn video_preview(&self) -> Option<Arc<dyn FrameProducer>>;

    /// A sink began consuming frames of the given geometry.
    fn started_decoding(&self, id: &str, sink_name: &str, width: u32, height: u32);

    /// A sink stopped consuming frames.
    fn stopped_decoding(&self, id: &str, sink_name: &str);
}

/// A decode lifecycle notification, as recorded by [`LocalControls`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DecodingEvent {
    Started {
        id: String,
        sink_name: String,
        width: u32,
        height: u32,
    },
    Stopped {
        id: String,
        sink_name: String,
    },
}

/// In-process control surface.
pub struct LocalControls {
    preview: Arc<dyn FrameProducer>,
    preview_started: AtomicBool,
    events: Mutex<Vec<DecodingEvent>>,
}

impl LocalControls {
    /// Wrap a preview producer. The preview counts as stopped until
    /// [`VideoControls::start_preview`] is called.
    pub fn new(preview: Arc<dyn FrameProducer>) -> Self {
        Self {
            preview,
            preview_started: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Decode notifications received so far, oldest first.
    pub fn events(&self) -> Vec<DecodingEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: DecodingEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl VideoControls for LocalControls {
    fn has_preview_started(&self) -> bool {
        self.preview_started.load(Ordering::SeqCst)
    }

    fn start_preview(&self) -> TesseraResult<()> {
        if !self.preview_started.swap(true, Ordering::SeqCst) {
            tracing::info!(source = %self.preview.source_id(), "Local preview started");
        }
        Ok(())
    }

    fn video_preview(&self) -> Option<Arc<dyn FrameProducer>> {
        self.has_preview_started().then(|| Arc::clone(&self.preview))
    }

    fn started_decoding(&self, id: &str, sink_name: &str, width: u32, height: u32) {
        tracing::info!(mixer = id, sink = sink_name, width, height, "Decoding started");
        self.record(DecodingEvent::Started {
            id: id.to_string(),
            sink_name: sink_name.to_string(),
            width,
            height,
        });
    }

    fn stopped_decoding(&self, id: &str, sink_name: &str) {
        tracing::info!(mixer = id, sink = sink_name, "Decoding stopped");
        self.record(DecodingEvent::Stopped {
            id: id.to_string(),
            sink_name: sink_name.to_string(),
        });
    }
}

impl std::fmt::Debug for LocalControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalControls")
            .field("preview", &self.preview.source_id())
            .field("preview_started", &self.has_preview_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_frame::{PatternColor, TestPatternSource};

    fn controls() -> LocalControls {
        LocalControls::new(Arc::new(TestPatternSource::new(
            8,
            8,
            PatternColor::Yuv([16, 128, 128]),
        )))
    }

    #[test]
    fn test_preview_is_hidden_until_started() {
        let controls = controls();
        assert!(!controls.has_preview_started());
        assert!(controls.video_preview().is_none());

        controls.start_preview().unwrap();
        assert!(controls.has_preview_started());
        assert!(controls.video_preview().is_some());
    }

    #[test]
    fn test_decode_events_are_recorded_in_order() {
        let controls = controls();
        controls.started_decoding("call-1", "call-1_MX", 640, 480);
        controls.stopped_decoding("call-1", "call-1_MX");

        assert_eq!(
            controls.events(),
            vec![
                DecodingEvent::Started {
                    id: "call-1".into(),
                    sink_name: "call-1_MX".into(),
                    width: 640,
                    height: 480,
                },
                DecodingEvent::Stopped {
                    id: "call-1".into(),
                    sink_name: "call-1_MX".into(),
                },
            ]
        );
    }
}
