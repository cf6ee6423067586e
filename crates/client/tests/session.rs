//! End-to-end tests: the client against a real server over TCP, backed by
//! the in-memory lock store on the system clock.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use studio_api::auth::jwt::{generate_access_token, JwtConfig};
use studio_api::config::{LockConfig, ServerConfig};
use studio_api::router::build_app_router;
use studio_api::state::AppState;
use studio_client::{ClientError, EditSession, LockClient, SessionOptions, SessionState, StatusPoller};
use studio_db::store::MemoryLockStore;

const QUOTATION: i64 = 7;

fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "client-test-secret-long-enough-for-hmac".to_string(),
        access_token_expiry_mins: 15,
    }
}

/// Start a server with the given lease and return its base URL.
async fn spawn_server(lease_secs: i64) -> String {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: jwt_config(),
        lock: LockConfig { lease_secs },
    };
    let state = AppState {
        locks: Arc::new(MemoryLockStore::new(lease_secs)),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client_for(base_url: &str, user_id: i64, name: &str) -> LockClient {
    let token = generate_access_token(user_id, name, &jwt_config()).unwrap();
    LockClient::new(base_url, token)
}

/// Retry `acquire` until it succeeds or `within` elapses.
async fn acquire_eventually(client: &LockClient, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if client.acquire(QUOTATION).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn second_editor_sees_conflict_until_close() {
    let base = spawn_server(30).await;
    let alice = client_for(&base, 10, "Alice Moreau");
    let bob = client_for(&base, 20, "Bob Tan");

    let session = EditSession::open(alice, QUOTATION).await.unwrap();
    assert!(session.is_holding());

    let err = EditSession::open(bob.clone(), QUOTATION).await.unwrap_err();
    assert_matches!(
        err,
        ClientError::Conflict { holder_id: Some(10), ref holder_name, .. } if holder_name == "Alice Moreau"
    );

    assert!(session.close().await);

    let status = bob.acquire(QUOTATION).await.unwrap();
    assert_eq!(status.locked_by, Some(20));
}

#[tokio::test]
async fn heartbeats_keep_lock_past_lease() {
    let base = spawn_server(1).await;
    let alice = client_for(&base, 10, "Alice");
    let bob = client_for(&base, 20, "Bob");

    let options = SessionOptions {
        heartbeat_interval: Duration::from_millis(250),
    };
    let session = EditSession::open_with(alice, QUOTATION, options).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(session.is_holding());
    assert_matches!(bob.acquire(QUOTATION).await, Err(ClientError::Conflict { .. }));

    session.close().await;
}

#[tokio::test]
async fn takeover_after_expiry_flips_session_to_lost() {
    let base = spawn_server(1).await;
    let alice = client_for(&base, 10, "Alice");
    let bob = client_for(&base, 20, "Bob");

    // Heartbeat slower than the lease so Alice's lease lapses first.
    let options = SessionOptions {
        heartbeat_interval: Duration::from_millis(1500),
    };
    let session = EditSession::open_with(alice, QUOTATION, options).await.unwrap();
    let mut state = session.subscribe();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(bob.acquire(QUOTATION).await.is_ok());

    tokio::time::timeout(Duration::from_secs(5), state.changed())
        .await
        .expect("heartbeat should report within the timeout")
        .unwrap();
    assert_eq!(*state.borrow(), SessionState::Lost);
    assert!(!session.is_holding());

    // Closing a lost session must not release Bob's lock.
    assert!(!session.close().await);
    let status = bob.status(QUOTATION).await.unwrap();
    assert_eq!(status.locked_by, Some(20));
}

#[tokio::test]
async fn dropping_session_releases_best_effort() {
    let base = spawn_server(30).await;
    let alice = client_for(&base, 10, "Alice");
    let bob = client_for(&base, 20, "Bob");

    let session = EditSession::open(alice, QUOTATION).await.unwrap();
    drop(session);

    assert!(
        acquire_eventually(&bob, Duration::from_secs(3)).await,
        "dropped session should release its lock"
    );
}

#[tokio::test]
async fn release_by_non_holder_reports_false() {
    let base = spawn_server(30).await;
    let alice = client_for(&base, 10, "Alice");
    let bob = client_for(&base, 20, "Bob");

    alice.acquire(QUOTATION).await.unwrap();
    assert!(!bob.release(QUOTATION).await.unwrap());
    assert!(alice.status(QUOTATION).await.unwrap().is_locked);
}

#[tokio::test]
async fn heartbeat_without_lock_is_lost() {
    let base = spawn_server(30).await;
    let alice = client_for(&base, 10, "Alice");

    assert_matches!(alice.heartbeat(QUOTATION).await, Err(ClientError::LockLost));
}

#[tokio::test]
async fn invalid_quotation_id_is_api_error() {
    let base = spawn_server(30).await;
    let alice = client_for(&base, 10, "Alice");

    assert_matches!(
        alice.status(0).await,
        Err(ClientError::Api { status: 400, .. })
    );
}

#[tokio::test]
async fn poller_tracks_holder_changes() {
    let base = spawn_server(30).await;
    let alice = client_for(&base, 10, "Alice");
    let bob = client_for(&base, 20, "Bob");

    let session = EditSession::open(alice, QUOTATION).await.unwrap();

    let poller = StatusPoller::spawn_with_interval(bob, QUOTATION, Duration::from_millis(100));
    let mut updates = poller.subscribe();

    let locked = tokio::time::timeout(
        Duration::from_secs(3),
        updates.wait_for(|s| s.as_ref().is_some_and(|s| s.is_locked)),
    )
    .await
    .expect("poller should observe the lock")
    .unwrap()
    .clone();
    assert_eq!(
        studio_client::held_by_other(locked.as_ref().unwrap(), 20),
        Some("Alice")
    );

    session.close().await;

    tokio::time::timeout(
        Duration::from_secs(3),
        updates.wait_for(|s| s.as_ref().is_some_and(|s| !s.is_locked)),
    )
    .await
    .expect("poller should observe the release")
    .unwrap();
    assert_eq!(poller.latest().map(|s| s.is_locked), Some(false));
}

#[tokio::test]
async fn poller_reports_no_info_when_server_unreachable() {
    // Nothing listens on this port once the listener is dropped.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = LockClient::new(format!("http://{addr}"), "token");
    let poller = StatusPoller::spawn_with_interval(client, QUOTATION, Duration::from_millis(50));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(poller.latest(), None);
}
