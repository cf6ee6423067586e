//! Lock status polling for viewers of a quotation.

use std::time::Duration;

use studio_core::lease::{LockStatus, STATUS_POLL_INTERVAL_SECS};
use studio_core::types::DbId;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::client::LockClient;

/// Polls a quotation's lock status on its own timer.
///
/// The latest value is `None` until the first poll succeeds and again after
/// any failed poll: "no lock info available" rather than an error. Polling
/// stops when the poller is dropped.
#[derive(Debug)]
pub struct StatusPoller {
    latest: watch::Receiver<Option<LockStatus>>,
    _stop: DropGuard,
}

impl StatusPoller {
    /// Start polling at the default interval.
    pub fn spawn(client: LockClient, quotation_id: DbId) -> Self {
        Self::spawn_with_interval(
            client,
            quotation_id,
            Duration::from_secs(STATUS_POLL_INTERVAL_SECS),
        )
    }

    pub fn spawn_with_interval(client: LockClient, quotation_id: DbId, every: Duration) -> Self {
        let (tx, latest) = watch::channel(None);
        let cancel = CancellationToken::new();
        tokio::spawn(run_poll(client, quotation_id, every, tx, cancel.clone()));

        Self {
            latest,
            _stop: cancel.drop_guard(),
        }
    }

    pub fn latest(&self) -> Option<LockStatus> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LockStatus>> {
        self.latest.clone()
    }
}

async fn run_poll(
    client: LockClient,
    quotation_id: DbId,
    every: Duration,
    tx: watch::Sender<Option<LockStatus>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let next = match client.status(quotation_id).await {
                    Ok(status) => Some(status),
                    Err(e) => {
                        tracing::debug!(quotation_id, error = %e, "Lock status poll failed");
                        None
                    }
                };
                tx.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    *current = next;
                    true
                });
            }
        }
    }
}

/// Name of the user to show in a "being edited by" banner, if the lock is
/// live and held by someone other than `viewer_id`.
pub fn held_by_other(status: &LockStatus, viewer_id: DbId) -> Option<&str> {
    if !status.is_locked || status.locked_by == Some(viewer_id) {
        return None;
    }
    Some(status.locked_by_name.as_deref().unwrap_or("another user"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use studio_core::lease::Lease;

    use super::*;

    fn held_by(holder_id: DbId, name: &str) -> LockStatus {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        LockStatus::from_live(&Lease::grant(1, holder_id, name, now, chrono::Duration::seconds(30)))
    }

    #[test]
    fn test_banner_for_other_holder() {
        assert_eq!(held_by_other(&held_by(4, "Mina"), 9), Some("Mina"));
    }

    #[test]
    fn test_no_banner_for_own_lock_or_unlocked() {
        assert_eq!(held_by_other(&held_by(4, "Mina"), 4), None);
        assert_eq!(held_by_other(&LockStatus::unlocked(), 4), None);
    }

    #[test]
    fn test_banner_falls_back_when_name_missing() {
        let mut status = held_by(4, "Mina");
        status.locked_by_name = None;
        assert_eq!(held_by_other(&status, 9), Some("another user"));
    }
}
