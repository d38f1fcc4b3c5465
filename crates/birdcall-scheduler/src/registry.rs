//! Live timer registry — derived, in-memory state.
//!
//! Maps schedule id → the tokio task that ticks for it. Rebuilt from the
//! store on every daemon start, never persisted. Aborting a ticker cancels
//! future firings only; in-flight firings run as separately spawned tasks
//! and are not touched.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::task::JoinHandle;

/// Owned map of live tickers. Held by the engine, not a global.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a ticker for `id`. Any previous ticker for the same id is
    /// stopped first so one schedule never fires twice per tick.
    pub fn register(&self, id: &str, handle: JoinHandle<()>) {
        let mut jobs = self.jobs.lock().expect("registry poisoned");
        if let Some(old) = jobs.insert(id.to_string(), handle) {
            tracing::warn!("Replacing live timer for {id}");
            old.abort();
        }
    }

    /// Stop and forget the ticker for `id`. No-op when absent.
    pub fn unregister_and_stop(&self, id: &str) -> bool {
        let removed = self.jobs.lock().expect("registry poisoned").remove(id);
        match removed {
            Some(handle) => {
                handle.abort();
                tracing::debug!("Stopped timer for {id}");
                true
            }
            None => false,
        }
    }

    /// Stop every ticker. Daemon shutdown only.
    pub fn stop_all(&self) {
        let mut jobs = self.jobs.lock().expect("registry poisoned");
        let count = jobs.len();
        for (_, handle) in jobs.drain() {
            handle.abort();
        }
        if count > 0 {
            tracing::info!("⏹️ Stopped {count} timers");
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.lock().expect("registry poisoned").contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().expect("registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
