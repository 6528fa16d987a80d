// src/tracker.rs
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Tracks which run is current for one editor. Starting a run supersedes the
/// previous one; results tagged with a stale id are dropped.
pub struct RunTracker {
    current: watch::Sender<u64>,
    next: AtomicU64,
}

/// Identifies one run. Cheap to clone; every clone observes supersession.
#[derive(Clone)]
pub struct RunHandle {
    id: u64,
    current: watch::Receiver<u64>,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        let (current, _) = watch::channel(0);
        Self {
            current,
            next: AtomicU64::new(0),
        }
    }

    /// Start a new run, making every earlier handle stale.
    pub fn begin(&self) -> RunHandle {
        let id = self.bump();
        RunHandle {
            id,
            current: self.current.subscribe(),
        }
    }

    /// Abandon whatever run is in flight without starting another.
    pub fn cancel(&self) {
        let id = self.bump();
        log::debug!("Run tracker cancelled; current id is now {}", id);
    }

    pub fn current(&self) -> u64 {
        *self.current.borrow()
    }

    pub fn is_current(&self, handle: &RunHandle) -> bool {
        self.current() == handle.id
    }

    /// Pass `value` through only if `handle` is still the current run.
    pub fn accept<T>(&self, handle: &RunHandle, value: T) -> Option<T> {
        if self.is_current(handle) {
            Some(value)
        } else {
            log::debug!(
                "Discarding result of stale run {} (current {})",
                handle.id,
                self.current()
            );
            None
        }
    }

    fn bump(&self) -> u64 {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.send_replace(id);
        id
    }
}

impl RunHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_stale(&self) -> bool {
        *self.current.borrow() != self.id
    }

    /// Resolves once a newer run has started or the tracker is gone.
    pub async fn superseded(&mut self) {
        let id = self.id;
        let _ = self.current.wait_for(|current| *current != id).await;
    }
}
