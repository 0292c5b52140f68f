//! Publish/subscribe fan-out for video frames.
//!
//! A [`FrameProducer`] accepts subscribers; a [`FrameConsumer`] receives
//! deliveries. Nodes that transform streams (such as the mixer) implement
//! both.
//!
//! Subscriber lists hold weak references, so attaching a consumer never
//! keeps it alive. Deliveries are synchronous, on the publishing thread, in
//! attach order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::frame::VideoFrame;

/// Opaque, process-unique identity of a frame producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Mint a fresh id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "src-{}", self.0)
    }
}

/// Receives frames from producers it is attached to.
pub trait FrameConsumer: Send + Sync {
    /// A frame was published by `source`.
    fn on_frame(&self, source: SourceId, frame: &Arc<VideoFrame>);

    /// This consumer was attached to `source`.
    fn attached(&self, _source: SourceId) {}

    /// This consumer was detached from `source`.
    fn detached(&self, _source: SourceId) {}
}

/// Publishes frames to attached consumers.
pub trait FrameProducer: Send + Sync {
    fn source_id(&self) -> SourceId;

    /// Attach `consumer`. Returns `false` if it was already attached.
    fn attach(&self, consumer: &Arc<dyn FrameConsumer>) -> bool;

    /// Detach `consumer`. Returns `false` if it was not attached.
    fn detach(&self, consumer: &dyn FrameConsumer) -> bool;
}

/// Reusable producer half: subscriber list plus the last published frame.
pub struct FramePublisher {
    id: SourceId,
    subscribers: Mutex<Vec<Weak<dyn FrameConsumer>>>,
    last: Mutex<Option<Arc<VideoFrame>>>,
}

impl FramePublisher {
    pub fn new() -> Self {
        Self {
            id: SourceId::next(),
            subscribers: Mutex::new(Vec::new()),
            last: Mutex::new(None),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Attach a consumer and notify it. Idempotent.
    pub fn attach(&self, consumer: &Arc<dyn FrameConsumer>) -> bool {
        {
            let mut subscribers = lock(&self.subscribers);
            let addr = consumer_addr(&**consumer);
            if subscribers.iter().any(|s| weak_addr(s) == addr) {
                return false;
            }
            subscribers.push(Arc::downgrade(consumer));
        }
        consumer.attached(self.id);
        true
    }

    /// Detach a consumer and notify it.
    pub fn detach(&self, consumer: &dyn FrameConsumer) -> bool {
        let removed = {
            let mut subscribers = lock(&self.subscribers);
            let addr = consumer_addr(consumer);
            match subscribers.iter().position(|s| weak_addr(s) == addr) {
                Some(pos) => {
                    subscribers.remove(pos);
                    true
                }
                None => false,
            }
        };
        if removed {
            consumer.detached(self.id);
        }
        removed
    }

    /// Whether `consumer` is currently attached.
    pub fn is_attached(&self, consumer: &dyn FrameConsumer) -> bool {
        let addr = consumer_addr(consumer);
        lock(&self.subscribers)
            .iter()
            .any(|s| weak_addr(s) == addr)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers)
            .iter()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    /// Store `frame` as the latest snapshot and deliver it to every live
    /// subscriber.
    ///
    /// The subscriber lock is released before delivery so consumers may
    /// attach or detach from within `on_frame`.
    pub fn publish(&self, frame: VideoFrame) -> Arc<VideoFrame> {
        let frame = Arc::new(frame);
        *lock(&self.last) = Some(Arc::clone(&frame));

        let live: Vec<Arc<dyn FrameConsumer>> = {
            let mut subscribers = lock(&self.subscribers);
            let before = subscribers.len();
            subscribers.retain(|s| s.strong_count() > 0);
            if subscribers.len() < before {
                tracing::trace!(
                    source = %self.id,
                    pruned = before - subscribers.len(),
                    "Dropped dead subscribers"
                );
            }
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for consumer in &live {
            consumer.on_frame(self.id, &frame);
        }
        frame
    }

    /// The last published frame. Published frames are never mutated, so the
    /// snapshot stays valid while later frames are published.
    pub fn last_frame(&self) -> Option<Arc<VideoFrame>> {
        lock(&self.last).clone()
    }

    /// Replace the last published frame with a blanked copy of it.
    pub fn clear_last(&self) {
        let mut last = lock(&self.last);
        if let Some(previous) = last.as_ref() {
            let mut blank = VideoFrame::clone(previous);
            blank.clear();
            *last = Some(Arc::new(blank));
        }
    }
}

impl Default for FramePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FramePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePublisher")
            .field("id", &self.id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn consumer_addr(consumer: &dyn FrameConsumer) -> *const () {
    consumer as *const dyn FrameConsumer as *const ()
}

fn weak_addr(weak: &Weak<dyn FrameConsumer>) -> *const () {
    weak.as_ptr() as *const ()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
