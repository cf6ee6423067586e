use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use studio_api::auth::jwt::{generate_access_token, JwtConfig};
use studio_api::config::{LockConfig, ServerConfig};
use studio_api::router::build_app_router;
use studio_api::state::AppState;
use studio_core::clock::ManualClock;
use studio_core::lease::DEFAULT_LEASE_SECS;
use studio_db::store::{LockStore, MemoryLockStore};
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        lock: LockConfig::default(),
    }
}

/// Build the full application router (same middleware stack as production)
/// over the given lock store.
pub fn build_test_app(locks: Arc<dyn LockStore>) -> Router {
    let config = test_config();
    let state = AppState {
        locks,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// App over an in-memory store whose clock only moves when the test says so.
pub fn memory_app() -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let store = MemoryLockStore::with_clock(DEFAULT_LEASE_SECS, clock.clone());
    (build_test_app(Arc::new(store)), clock)
}

/// Bearer token for a user, signed with the test secret.
pub fn token_for(user_id: i64, name: &str) -> String {
    generate_access_token(user_id, name, &test_config().jwt)
        .expect("token generation should succeed")
}

/// Send a bodiless request, optionally authenticated.
pub async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
