//! Progress reporting for long-running scans and batch operations.
//!
//! The core never draws anything itself. It hands a [`Progress`] snapshot to
//! whatever [`ProgressObserver`] the caller supplied, and carries on with the
//! work regardless of what the observer does with it.

/// A snapshot of how far an operation has come.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Items handled so far (files found, deleted or moved).
    pub items_done: u64,
    /// Total items, when known up front. Directory walks don't know it.
    pub total_items: Option<u64>,
    /// Cumulative bytes handled so far.
    pub bytes_done: u64,
}

/// Receives progress updates from the scan, clean and archive operations.
pub trait ProgressObserver {
    /// Called after every item.
    fn on_progress(&self, progress: Progress);

    /// Called once when the operation has finished its loop.
    fn on_finish(&self) {}
}

/// Observer that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _progress: Progress) {}
}

/// Running counter that feeds an observer.
pub(crate) struct Tracker<'a> {
    observer: &'a dyn ProgressObserver,
    current: Progress,
}

impl<'a> Tracker<'a> {
    pub(crate) fn new(observer: &'a dyn ProgressObserver, total_items: Option<u64>) -> Self {
        Self {
            observer,
            current: Progress {
                total_items,
                ..Progress::default()
            },
        }
    }

    /// Counts one more item of `bytes` size and notifies the observer.
    pub(crate) fn advance(&mut self, bytes: u64) {
        self.current.items_done += 1;
        self.current.bytes_done += bytes;
        self.observer.on_progress(self.current);
    }

    pub(crate) fn finish(self) {
        self.observer.on_finish();
    }
}
