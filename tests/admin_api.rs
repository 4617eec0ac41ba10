mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::Harness;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use tunnel_health::admin::{setup_admin_router, AdminState};
use tunnel_health::tracer::{TracerId, TracerStage};

const KEY: &str = "test-key";

fn router(h: &Harness) -> Router {
    setup_admin_router(AdminState {
        monitor: h.monitor.clone(),
        api_key: Arc::from(KEY),
        default_window_secs: 10,
    })
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {KEY}"));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_requests_without_key_are_rejected() {
    let h = Harness::new();
    let req = Request::builder().uri("/admin/health").body(Body::empty()).unwrap();
    let response = router(&h).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/admin/health")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let response = router(&h).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_snapshot() {
    let h = Harness::new();
    let (status, body) = json(router(&h), request("GET", "/admin/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running"], false);
    assert_eq!(body["health"]["state"], "initializing");
    assert_eq!(body["metrics"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_inject_and_list_tracers() {
    let h = Harness::new();
    let (status, body) = json(router(&h), request("POST", "/admin/tracers/inject?times=4", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requested"], 4);
    assert_eq!(body["accepted"], 4);
    assert_eq!(h.queue.len(), 4);

    let (status, body) = json(router(&h), request("GET", "/admin/tracers", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], 4);
    assert_eq!(body["invalid"], 0);
}

#[tokio::test]
async fn test_inject_rejects_out_of_range_counts() {
    let h = Harness::new();
    let (status, _) = json(router(&h), request("POST", "/admin/tracers/inject?times=0", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = json(router(&h), request("POST", "/admin/tracers/inject?times=1001", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.queue.len(), 0);
}

#[tokio::test]
async fn test_lookup_single_tracer() {
    let h = Harness::new();
    let id = TracerId::from("abc");
    h.registry.record_now(&id, TracerStage::Created);
    h.registry.record_now(&id, TracerStage::WrittenToDevice);

    let (status, body) = json(router(&h), request("GET", "/admin/tracers/abc", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "completed");
    assert_eq!(body["stages"][1], "WRITTEN_TO_DEVICE");

    let (status, _) = json(router(&h), request("GET", "/admin/tracers/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_tracers() {
    let h = Harness::new();
    h.monitor.inject_probes(3);
    let (status, body) = json(router(&h), request("DELETE", "/admin/tracers", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 3);
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn test_simulate_and_notifications() {
    let h = Harness::new();
    let (status, body) = json(
        router(&h),
        request("POST", "/admin/simulate", Some(serde_json::json!({ "state": "bad" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forced_state"], "bad");

    let (_, body) = json(
        router(&h),
        request("POST", "/admin/simulate", Some(serde_json::json!({ "state": null }))),
    )
    .await;
    assert_eq!(body["forced_state"], Value::Null);

    let (_, body) = json(
        router(&h),
        request("POST", "/admin/notifications", Some(serde_json::json!({ "enabled": false }))),
    )
    .await;
    assert_eq!(body["notifications_enabled"], false);
    assert!(!h.monitor.notifications_enabled());
}
