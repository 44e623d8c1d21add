//! Health, model and stats handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System};

use fembed_models::LoadingProgress;

use crate::state::AppState;

/// Process memory stats.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
}

/// Health response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub ready: bool,
    pub version: String,
    pub timestamp: String,
    pub uptime: u64,
    pub progress: LoadingProgress,
    pub memory: MemoryStats,
}

/// Health check endpoint. Reports liveness regardless of readiness;
/// the `ready` flag and progress map say whether requests will be
/// served.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.readiness.snapshot();
    Json(HealthResponse {
        status: if snapshot.ready { "ok" } else { "loading" }.to_string(),
        ready: snapshot.ready,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.readiness.uptime_secs(),
        progress: snapshot.progress,
        memory: memory_stats(),
    })
}

/// Models response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub ready: bool,
    pub progress: LoadingProgress,
    pub models: Vec<String>,
}

/// List tracked models and their loading state.
pub async fn models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let snapshot = state.readiness.snapshot();
    let models = snapshot.progress.model_names();
    Json(ModelsResponse {
        ready: snapshot.ready,
        progress: snapshot.progress,
        models,
    })
}

/// Stats response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub ready: bool,
    pub uptime: u64,
    pub memory: MemoryStats,
    pub progress: LoadingProgress,
}

/// Raw process stats endpoint.
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.readiness.snapshot();
    Json(StatsResponse {
        ready: snapshot.ready,
        uptime: state.readiness.uptime_secs(),
        memory: memory_stats(),
        progress: snapshot.progress,
    })
}

/// Sample this process's memory usage.
fn memory_stats() -> MemoryStats {
    let pid = Pid::from_u32(std::process::id());
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_processes(ProcessRefreshKind::new()));
    sys.refresh_process(pid);

    match sys.process(pid) {
        Some(process) => MemoryStats {
            rss_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
        },
        None => MemoryStats {
            rss_bytes: 0,
            virtual_bytes: 0,
        },
    }
}
