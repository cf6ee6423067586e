//! Editing session: hold a quotation lock for as long as an editor is open.
//!
//! [`EditSession::open`] acquires the lock and starts a heartbeat task. The
//! task is owned through a [`CancellationToken`] and is stopped on every way
//! out of the session: [`EditSession::close`], or dropping the session.
//!
//! Dropping without `close` still fires a release, but as a detached
//! fire-and-forget request. If that request never arrives the lease simply
//! expires on the server; this is expected, not an error.

use std::time::Duration;

use studio_core::lease::{LockStatus, HEARTBEAT_INTERVAL_SECS};
use studio_core::types::DbId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::LockClient;
use crate::error::ClientError;

/// Whether the session still believes it holds the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Last acquire or heartbeat succeeded.
    Holding(LockStatus),
    /// A heartbeat was rejected or could not be delivered. The editor may
    /// keep working; the UI should warn that edits may collide.
    Lost,
}

/// Tuning for an [`EditSession`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub heartbeat_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(HEARTBEAT_INTERVAL_SECS),
        }
    }
}

/// A held quotation lock with a running heartbeat.
#[derive(Debug)]
pub struct EditSession {
    client: LockClient,
    quotation_id: DbId,
    cancel: CancellationToken,
    heartbeat: Option<JoinHandle<()>>,
    state: watch::Receiver<SessionState>,
    closed: bool,
}

impl EditSession {
    /// Acquire the lock and start heartbeating at the default interval.
    ///
    /// Fails with [`ClientError::Conflict`] when another user is editing.
    pub async fn open(client: LockClient, quotation_id: DbId) -> Result<Self, ClientError> {
        Self::open_with(client, quotation_id, SessionOptions::default()).await
    }

    pub async fn open_with(
        client: LockClient,
        quotation_id: DbId,
        options: SessionOptions,
    ) -> Result<Self, ClientError> {
        let status = client.acquire(quotation_id).await?;
        tracing::info!(quotation_id, "Edit session opened");

        let (state_tx, state) = watch::channel(SessionState::Holding(status));
        let cancel = CancellationToken::new();
        let heartbeat = tokio::spawn(run_heartbeat(
            client.clone(),
            quotation_id,
            options.heartbeat_interval,
            state_tx,
            cancel.clone(),
        ));

        Ok(Self {
            client,
            quotation_id,
            cancel,
            heartbeat: Some(heartbeat),
            state,
            closed: false,
        })
    }

    pub fn quotation_id(&self) -> DbId {
        self.quotation_id
    }

    pub fn is_holding(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Holding(_))
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch state changes (e.g. to flip the UI into "lock lost" mode).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Stop heartbeating and release the lock.
    ///
    /// Waits for any in-flight heartbeat first so it cannot land after the
    /// release. Release failures are logged and reported as `false`.
    pub async fn close(mut self) -> bool {
        self.cancel.cancel();
        if let Some(handle) = self.heartbeat.take() {
            if let Err(e) = handle.await {
                tracing::warn!(quotation_id = self.quotation_id, error = %e, "Heartbeat task failed");
            }
        }
        self.closed = true;

        match self.client.release(self.quotation_id).await {
            Ok(released) => {
                tracing::info!(quotation_id = self.quotation_id, released, "Edit session closed");
                released
            }
            Err(e) => {
                tracing::warn!(
                    quotation_id = self.quotation_id,
                    error = %e,
                    "Lock release failed, lease will expire"
                );
                false
            }
        }
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        if self.closed {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(
                quotation_id = self.quotation_id,
                "No runtime to release on, lease will expire"
            );
            return;
        };

        let client = self.client.clone();
        let quotation_id = self.quotation_id;
        runtime.spawn(async move {
            if let Err(e) = client.release(quotation_id).await {
                tracing::debug!(quotation_id, error = %e, "Best-effort release failed");
            }
        });
    }
}

/// Renew the lease every `interval` until cancelled or the lease is lost.
///
/// The first beat fires one interval after the acquire.
async fn run_heartbeat(
    client: LockClient,
    quotation_id: DbId,
    interval: Duration,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(quotation_id, "Heartbeat cancelled");
                break;
            }
            _ = ticker.tick() => {
                match client.heartbeat(quotation_id).await {
                    Ok(status) => {
                        tracing::debug!(quotation_id, "Heartbeat accepted");
                        state.send_replace(SessionState::Holding(status));
                    }
                    Err(e) => {
                        tracing::warn!(
                            quotation_id,
                            error = %e,
                            "Heartbeat failed, no longer holding the lock"
                        );
                        state.send_replace(SessionState::Lost);
                        break;
                    }
                }
            }
        }
    }
}
