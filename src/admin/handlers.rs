use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::admin::AdminState;
use crate::health::{HealthVerdict, MonitorSnapshot};
use crate::tracer::{TracerId, TracerStage, TracerSummary};

/// Upper bound on tracers injected by one request.
pub const MAX_INJECT: usize = 1_000;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub monitor_running: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TracerView {
    pub id: TracerId,
    pub kind: String,
    pub duration_ms: Option<f64>,
    pub stages: Vec<TracerStage>,
    pub reason: Option<String>,
    pub detail: String,
}

impl From<&TracerSummary> for TracerView {
    fn from(summary: &TracerSummary) -> Self {
        let (duration_ms, stages, reason) = match summary {
            TracerSummary::Completed { duration, events, .. } => (
                Some(duration.as_secs_f64() * 1_000.0),
                events.iter().map(|e| e.stage).collect(),
                None,
            ),
            TracerSummary::Invalid { reason, .. } => (None, Vec::new(), Some(reason.clone())),
            TracerSummary::InFlight { .. } => (None, Vec::new(), None),
        };
        Self {
            id: summary.id().clone(),
            kind: summary.kind().to_string(),
            duration_ms,
            stages,
            reason,
            detail: summary.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TracerReport {
    pub window_secs: u64,
    pub completed: usize,
    pub invalid: usize,
    pub in_flight: usize,
    pub tracers: Vec<TracerView>,
}

#[derive(Deserialize)]
pub struct WindowQuery {
    pub window_secs: Option<u64>,
}

#[derive(Deserialize)]
pub struct InjectQuery {
    pub times: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InjectResult {
    pub requested: usize,
    pub accepted: usize,
}

#[derive(Deserialize)]
pub struct SimulateRequest {
    pub state: Option<HealthVerdict>,
}

#[derive(Deserialize)]
pub struct NotificationsRequest {
    pub enabled: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        monitor_running: state.monitor.is_running(),
    })
}

pub async fn get_health(State(state): State<AdminState>) -> Json<MonitorSnapshot> {
    Json(state.monitor.snapshot())
}

pub async fn get_tracers(
    State(state): State<AdminState>,
    Query(query): Query<WindowQuery>,
) -> Json<TracerReport> {
    let window_secs = query.window_secs.unwrap_or(state.default_window_secs);
    let summaries = state.monitor.tracer_summaries(Duration::from_secs(window_secs));

    let mut report = TracerReport {
        window_secs,
        ..TracerReport::default()
    };
    for summary in &summaries {
        match summary {
            TracerSummary::Completed { .. } => report.completed += 1,
            TracerSummary::Invalid { .. } => report.invalid += 1,
            TracerSummary::InFlight { .. } => report.in_flight += 1,
        }
        report.tracers.push(TracerView::from(summary));
    }
    Json(report)
}

pub async fn get_tracer(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<TracerView>, StatusCode> {
    let summary = state.monitor.registry().lookup(&TracerId::from(id));
    if summary.created_at().is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(TracerView::from(&summary)))
}

pub async fn inject_tracers(
    State(state): State<AdminState>,
    Query(query): Query<InjectQuery>,
) -> Result<Json<InjectResult>, StatusCode> {
    let requested = query.times.unwrap_or(1);
    if requested == 0 || requested > MAX_INJECT {
        return Err(StatusCode::BAD_REQUEST);
    }
    let accepted = state.monitor.inject_probes(requested);
    Ok(Json(InjectResult { requested, accepted }))
}

pub async fn clear_tracers(State(state): State<AdminState>) -> Json<serde_json::Value> {
    let registry = state.monitor.registry();
    let cleared = registry.len();
    registry.clear();
    Json(serde_json::json!({ "cleared": cleared }))
}

pub async fn simulate(
    State(state): State<AdminState>,
    Json(request): Json<SimulateRequest>,
) -> Json<MonitorSnapshot> {
    state.monitor.force_state(request.state);
    Json(state.monitor.snapshot())
}

pub async fn set_notifications(
    State(state): State<AdminState>,
    Json(request): Json<NotificationsRequest>,
) -> Json<MonitorSnapshot> {
    state.monitor.set_notifications_enabled(request.enabled);
    Json(state.monitor.snapshot())
}
