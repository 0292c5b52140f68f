//! Ordered set of attached sources.
//!
//! Not synchronized on its own: the mixer keeps it behind the same lock as
//! rendering, so membership never changes mid-render.

use tessera_frame::SourceId;

/// Attached sources in insertion order.
///
/// A source's grid slot is its current position here, looked up at the
/// moment its frame arrives. Detaching an earlier source therefore shifts
/// every later source one slot back.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceId>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source. Attaching the same source twice gives it two entries.
    pub fn attach(&mut self, source: SourceId) {
        self.sources.push(source);
    }

    /// Remove the first entry for `source`. Returns `false` if absent.
    pub fn detach(&mut self, source: SourceId) -> bool {
        match self.sources.iter().position(|s| *s == source) {
            Some(pos) => {
                self.sources.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Zero-based position of `source`.
    pub fn index_of(&self, source: SourceId) -> Option<usize> {
        self.sources.iter().position(|s| *s == source)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.iter().copied()
    }
}
