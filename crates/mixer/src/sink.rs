//! Downstream sink lifecycle.
//!
//! The mixer feeds exactly one sink endpoint (a shared-memory writer, a
//! file, a network bridge). [`SinkController`] keeps the invariant that the
//! endpoint is subscribed to the mixer's output if and only if it is
//! started, and reports each transition to the control surface.

use std::sync::Arc;

use tessera_common::error::TesseraResult;
use tessera_frame::{FrameConsumer, FramePublisher};

use crate::controls::VideoControls;

/// A consumer endpoint that must be opened before it receives frames.
pub trait SinkEndpoint: FrameConsumer {
    /// Open the endpoint.
    fn start(&self) -> TesseraResult<()>;

    /// Close the endpoint.
    fn stop(&self);

    /// Identifier of the currently (or last) opened endpoint.
    fn opened_name(&self) -> String;
}

/// Lifecycle state of the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Stopped,
    Started,
}

/// Starts, stops, and restarts one sink against a publisher.
pub struct SinkController {
    endpoint: Arc<dyn SinkEndpoint>,
    consumer: Arc<dyn FrameConsumer>,
    controls: Arc<dyn VideoControls>,
    mixer_id: String,
    state: SinkState,
}

impl SinkController {
    pub fn new<S: SinkEndpoint + 'static>(
        sink: Arc<S>,
        controls: Arc<dyn VideoControls>,
        mixer_id: impl Into<String>,
    ) -> Self {
        Self {
            consumer: sink.clone(),
            endpoint: sink,
            controls,
            mixer_id: mixer_id.into(),
            state: SinkState::Stopped,
        }
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn opened_name(&self) -> String {
        self.endpoint.opened_name()
    }

    /// Open the endpoint and subscribe it to `output`.
    ///
    /// Always opens the endpoint, so callers stop a started sink first. On
    /// failure the sink stays stopped; there is no retry. Returns whether the
    /// sink is started afterwards.
    pub fn start(&mut self, output: &FramePublisher, width: u32, height: u32) -> bool {
        if let Err(e) = self.endpoint.start() {
            tracing::warn!(mixer = %self.mixer_id, error = %e, "Sink startup failed");
            self.state = SinkState::Stopped;
            return false;
        }

        if !output.is_attached(&*self.consumer) {
            output.attach(&self.consumer);
        }
        self.state = SinkState::Started;

        let name = self.endpoint.opened_name();
        self.controls
            .started_decoding(&self.mixer_id, &name, width, height);
        tracing::debug!(mixer = %self.mixer_id, sink = %name, width, height, "Sink started");
        true
    }

    /// Unsubscribe the endpoint from `output`, report it, then close it.
    ///
    /// Runs when the sink is started or still subscribed, so a consumer
    /// detached behind the controller's back is still closed and reported.
    pub fn stop(&mut self, output: &FramePublisher) {
        let detached = output.detach(&*self.consumer);
        if self.state == SinkState::Stopped && !detached {
            return;
        }
        self.state = SinkState::Stopped;

        let name = self.endpoint.opened_name();
        self.controls.stopped_decoding(&self.mixer_id, &name);
        self.endpoint.stop();
        tracing::debug!(mixer = %self.mixer_id, sink = %name, detached, "Sink stopped");
    }

    /// Full stop/start cycle against new geometry.
    pub fn restart(&mut self, output: &FramePublisher, width: u32, height: u32) -> bool {
        self.stop(output);
        self.start(output, width, height)
    }
}

impl std::fmt::Debug for SinkController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkController")
            .field("mixer_id", &self.mixer_id)
            .field("sink", &self.endpoint.opened_name())
            .field("state", &self.state)
            .finish()
    }
}
