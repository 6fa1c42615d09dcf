/// Active run tracking for cancellation
///
/// Runs dispatched through the API register here so another request can
/// cancel them by id. The engine only polls the token between nodes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone)]
pub struct RunTracker {
    active: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run; `None` if a run with the same id is already active
    ///
    /// The run stays registered until the returned guard is dropped.
    pub fn register(&self, run_id: &str) -> Option<RunGuard> {
        let mut active = self.lock();
        if active.contains_key(run_id) {
            return None;
        }

        let token = CancellationToken::new();
        active.insert(run_id.to_string(), token.clone());
        Some(RunGuard {
            tracker: self.clone(),
            run_id: run_id.to_string(),
            token,
        })
    }

    /// Signal cancellation; returns false for unknown or finished runs
    pub fn cancel(&self, run_id: &str) -> bool {
        match self.lock().get(run_id) {
            Some(token) => {
                token.cancel();
                tracing::info!("🛑 Cancellation requested for run {}", run_id);
                true
            }
            None => false,
        }
    }

    pub fn active_runs(&self) -> Vec<String> {
        let mut runs: Vec<_> = self.lock().keys().cloned().collect();
        runs.sort();
        runs
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        // The map holds no invariants a panicking holder could break
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps a run registered while alive
#[derive(Debug)]
pub struct RunGuard {
    tracker: RunTracker,
    run_id: String,
    token: CancellationToken,
}

impl RunGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.tracker.lock().remove(&self.run_id);
    }
}
