//! Application state.

use std::sync::{Arc, OnceLock};

use fembed_engine::{BatchRunner, InferenceEngine, ReadinessState, StrategyController};
use fembed_models::DetectorConfig;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Detection components, installed once the engine has loaded.
pub struct EngineContext {
    pub controller: StrategyController,
    pub runner: BatchRunner,
}

/// Shared application state.
///
/// The engine context is absent while models load; handlers that need
/// it reject with 503 until `install_engine` has run. After install the
/// state is effectively immutable from the handlers' perspective.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub readiness: ReadinessState,
    pub cascade: Arc<Vec<DetectorConfig>>,
    engine: Arc<OnceLock<EngineContext>>,
}

impl AppState {
    /// Create state tracking the given model names, engine not yet loaded.
    pub fn new<I, S>(config: ApiConfig, model_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config,
            readiness: ReadinessState::new(model_names),
            cascade: Arc::new(DetectorConfig::default_cascade()),
            engine: Arc::new(OnceLock::new()),
        }
    }

    /// Install the loaded engine and flip readiness. Called once at the
    /// end of the startup phase.
    pub fn install_engine(&self, engine: Arc<dyn InferenceEngine>) {
        let context = EngineContext {
            controller: StrategyController::new(engine.clone()),
            runner: BatchRunner::new(engine),
        };
        if self.engine.set(context).is_ok() {
            self.readiness.set_ready();
        }
    }

    /// Detection components, or 503 with the current progress snapshot
    /// while models are still loading.
    pub fn engine_context(&self) -> ApiResult<&EngineContext> {
        if !self.readiness.is_ready() {
            return Err(ApiError::NotReady(self.readiness.snapshot().progress));
        }
        self.engine
            .get()
            .ok_or_else(|| ApiError::internal("Engine marked ready but not installed"))
    }
}
