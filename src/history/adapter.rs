use super::engine::DepthId;

/// One synthetic native-history entry, mirroring a forward navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub depth_id: DepthId,
    pub step: usize,
}

/// Seam between the engine and the host's back-navigation primitive.
///
/// A browser shell forwards `push` to `window.history.pushState`; the reverse
/// direction is not part of the trait because the host delivers back gestures
/// by calling [`HistoryEngine::handle_back`] from its own popstate handler.
///
/// [`HistoryEngine::handle_back`]: super::HistoryEngine::handle_back
pub trait HistoryAdapter {
    fn push(&mut self, entry: HistoryEntry);
}

impl<A: HistoryAdapter + ?Sized> HistoryAdapter for Box<A> {
    fn push(&mut self, entry: HistoryEntry) {
        (**self).push(entry);
    }
}

/// Adapter for shells without a native back-stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAdapter;

impl HistoryAdapter for NullAdapter {
    fn push(&mut self, _entry: HistoryEntry) {}
}

/// Records every synthetic push, keeping the native-history depth observable.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    pub entries: Vec<HistoryEntry>,
}

impl RecordingAdapter {
    pub fn push_count(&self) -> usize {
        self.entries.len()
    }
}

impl HistoryAdapter for RecordingAdapter {
    fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }
}
