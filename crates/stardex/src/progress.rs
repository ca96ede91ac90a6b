//! Progress reporting for fetch cycles.
//!
//! The fetch engine emits [`FetchProgress`] events through an optional
//! [`ProgressCallback`]. Progress is counted in "items-equivalent" units: every
//! page counts as [`PAGE_SIZE`](crate::types::PAGE_SIZE) items because the true
//! item count is only known once the last page arrives.

use std::sync::Mutex;

/// Progress events emitted during a fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchProgress {
    /// Page 1 arrived and the page count is known.
    FetchStarted {
        /// The user whose stars are being fetched.
        subject: String,
        /// Number of pages advertised by the Link header.
        total_pages: u32,
    },

    /// A page arrived. Emitted in completion order, not page order.
    PageFetched {
        /// Page number (1-indexed).
        page: u32,
        /// Number of repositories on this page.
        count: usize,
        /// Items-equivalent processed so far; never decreases within a cycle.
        current: u64,
        /// Items-equivalent expected in total.
        total: u64,
    },

    /// Every page arrived.
    FetchComplete {
        /// Actual number of repositories fetched.
        total_items: usize,
    },
}

impl FetchProgress {
    /// The `(current, total)` pair carried by this event, if any.
    #[must_use]
    pub fn counts(&self) -> Option<(u64, u64)> {
        match self {
            Self::PageFetched { current, total, .. } => Some((*current, *total)),
            _ => None,
        }
    }
}

/// Callback for progress updates during a fetch.
pub type ProgressCallback = Box<dyn Fn(FetchProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: FetchProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

/// Snapshot of fetch progress for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub current: u64,
    pub total: u64,
    /// True only while a fetch is in flight.
    pub visible: bool,
}

/// Shared progress state for one fetch cycle at a time.
///
/// `current` is clamped so it never moves backwards between [`begin`] and
/// [`finish`].
///
/// [`begin`]: ProgressTracker::begin
/// [`finish`]: ProgressTracker::finish
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new fetch cycle and make the progress visible.
    pub fn begin(&self) {
        let mut state = self.lock();
        *state = ProgressState {
            current: 0,
            total: 0,
            visible: true,
        };
    }

    /// Apply an event to the state.
    pub fn apply(&self, event: &FetchProgress) {
        if let Some((current, total)) = event.counts() {
            let mut state = self.lock();
            state.current = state.current.max(current);
            state.total = total;
        }
    }

    /// Hide the progress; the counters keep their last values.
    pub fn finish(&self) {
        self.lock().visible = false;
    }

    pub fn snapshot(&self) -> ProgressState {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProgressState> {
        // The state is plain data, so a poisoned lock still holds a usable value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
