//! Admin API.
//!
//! Diagnostic surface of the daemon: health snapshot, tracer inspection,
//! on-demand tracer injection and the test-harness overrides. Every route
//! requires the configured bearer key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::health::HealthMonitor;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State injected into admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub monitor: HealthMonitor,
    pub api_key: Arc<str>,
    pub default_window_secs: u64,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/health", get(get_health))
        .route("/admin/tracers", get(get_tracers).delete(clear_tracers))
        .route("/admin/tracers/inject", post(inject_tracers))
        .route("/admin/tracers/{id}", get(get_tracer))
        .route("/admin/simulate", post(simulate))
        .route("/admin/notifications", post(set_notifications))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
