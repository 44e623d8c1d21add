//! Engine readiness lifecycle.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use fembed_models::LoadingProgress;

/// Immutable snapshot of the engine lifecycle state.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub ready: bool,
    pub progress: LoadingProgress,
}

/// Two-phase readiness state.
///
/// The startup phase writes: each model load flips its progress flag
/// and `set_ready` flips the ready bit last. The serving phase only
/// ever reads snapshots, so request handlers never contend on the
/// write path after init completes.
#[derive(Clone)]
pub struct ReadinessState {
    inner: Arc<RwLock<Inner>>,
    started_at: Instant,
}

struct Inner {
    ready: bool,
    progress: LoadingProgress,
}

impl ReadinessState {
    /// Create state tracking the given model names, all unloaded.
    pub fn new<I, S>(model_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                ready: false,
                progress: LoadingProgress::new(model_names),
            })),
            started_at: Instant::now(),
        }
    }

    /// Mark one model as loaded. Startup phase only.
    pub fn mark_loaded(&self, name: &str) {
        if let Ok(mut inner) = self.inner.write() {
            inner.progress.mark_loaded(name);
        }
    }

    /// Flip the ready bit. Called once, after every model has loaded.
    pub fn set_ready(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.ready = true;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.read().map(|inner| inner.ready).unwrap_or(false)
    }

    /// Snapshot of the current lifecycle state.
    pub fn snapshot(&self) -> EngineStatus {
        match self.inner.read() {
            Ok(inner) => EngineStatus {
                ready: inner.ready,
                progress: inner.progress.clone(),
            },
            Err(_) => EngineStatus {
                ready: false,
                progress: LoadingProgress::default(),
            },
        }
    }

    /// Seconds since this state was created (process startup).
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_phase_lifecycle() {
        let state = ReadinessState::new(["detector", "recognizer"]);
        assert!(!state.is_ready());
        assert!(!state.snapshot().progress.all_loaded());

        state.mark_loaded("detector");
        let snapshot = state.snapshot();
        assert!(!snapshot.ready);
        assert!(!snapshot.progress.all_loaded());

        state.mark_loaded("recognizer");
        assert!(state.snapshot().progress.all_loaded());
        // Ready is flipped explicitly, not inferred from progress.
        assert!(!state.is_ready());

        state.set_ready();
        assert!(state.is_ready());
        assert!(state.snapshot().ready);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let state = ReadinessState::new(["detector"]);
        let before = state.snapshot();
        state.mark_loaded("detector");
        // Earlier snapshots do not observe later writes.
        assert!(!before.progress.all_loaded());
        assert!(state.snapshot().progress.all_loaded());
    }
}
