//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get, memory_app, send, token_for};
use studio_core::lease::{AcquireOutcome, HeartbeatOutcome, Lease};
use studio_core::types::DbId;
use studio_db::store::{LockStore, StoreError, StoreResult};
use tower::ServiceExt;

/// A store whose backing database is unreachable.
struct UnreachableStore;

fn unreachable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl LockStore for UnreachableStore {
    async fn acquire(&self, _: DbId, _: DbId, _: &str) -> StoreResult<AcquireOutcome> {
        Err(unreachable())
    }

    async fn heartbeat(&self, _: DbId, _: DbId) -> StoreResult<HeartbeatOutcome> {
        Err(unreachable())
    }

    async fn release(&self, _: DbId, _: DbId) -> StoreResult<bool> {
        Err(unreachable())
    }

    async fn status(&self, _: DbId) -> StoreResult<Option<Lease>> {
        Err(unreachable())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Err(unreachable())
    }
}

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let (app, _clock) = memory_app();
    let response = get(&app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["db_healthy"], true);
}

// ---------------------------------------------------------------------------
// Test: an unreachable store degrades health and fails lock calls with 500
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_store_degrades_health() {
    let app = common::build_test_app(Arc::new(UnreachableStore));

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], false);

    let token = token_for(10, "Alice");
    let response = send(&app, Method::POST, "/api/v1/quotations/1/lock", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let (app, _clock) = memory_app();
    let response = get(&app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let (app, _clock) = memory_app();
    let response = get(&app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36, "x-request-id should be a UUID");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight allows the lock heartbeat method
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_patch() {
    let (app, _clock) = memory_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/quotations/1/lock")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "PATCH")
        .header("Access-Control-Request-Headers", "authorization")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    let allow_origin = headers
        .get("access-control-allow-origin")
        .expect("Missing Access-Control-Allow-Origin header")
        .to_str()
        .unwrap();
    assert_eq!(allow_origin, "http://localhost:5173");

    let allow_methods = headers
        .get("access-control-allow-methods")
        .expect("Missing Access-Control-Allow-Methods header")
        .to_str()
        .unwrap();
    assert!(
        allow_methods.contains("PATCH"),
        "Allow-Methods should contain PATCH, got: {allow_methods}"
    );
}
