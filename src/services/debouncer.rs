//! Keyed debouncing of deferred work.
//!
//! Each debounce id has at most one pending task. Scheduling again under the
//! same id aborts the pending task before it runs and starts a fresh quiet
//! period, so only the last call in a burst fires.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

struct PendingTask {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct DebounceState {
    next_generation: u64,
    pending: HashMap<String, PendingTask>,
}

/// Owns one cancellable timer per debounce id. Clones share the same timers.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    state: Arc<Mutex<DebounceState>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(DebounceState::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `task` after the quiet period unless another call with the same id supersedes it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, id: &str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        state.next_generation += 1;
        let generation = state.next_generation;

        if let Some(previous) = state.pending.remove(id) {
            previous.handle.abort();
            debug!(id, "Superseded pending debounced task");
        }

        let delay = self.delay;
        let shared = Arc::clone(&self.state);
        let key = id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = match shared.lock() {
                    Ok(state) => state,
                    Err(poisoned) => poisoned.into_inner(),
                };
                match state.pending.get(&key) {
                    Some(pending) if pending.generation == generation => {
                        state.pending.remove(&key);
                    }
                    _ => return,
                }
            }
            debug!(id = %key, "Running debounced task");
            task();
        });

        state
            .pending
            .insert(id.to_string(), PendingTask { generation, handle });
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.pending.contains_key(id))
            .unwrap_or(false)
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().map(|s| s.pending.len()).unwrap_or(0)
    }
}
