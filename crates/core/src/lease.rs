//! Quotation edit-lock leases: constants, types, and decision rules.
//!
//! A lease grants one holder the right to edit a quotation until
//! `expires_at`. Liveness is always derived by comparing `expires_at` with
//! the current time; nothing sweeps expired leases, and an expired record is
//! indistinguishable from no record. The functions here are the single
//! definition of the acquire/heartbeat/release rules. The in-memory store
//! calls them directly and the Postgres repository encodes the same rules in
//! SQL.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// Default lease duration in seconds.
pub const DEFAULT_LEASE_SECS: i64 = 30;

/// Minimum configurable lease duration in seconds. Must stay above
/// [`HEARTBEAT_INTERVAL_SECS`] or holders lose their lease between beats.
pub const MIN_LEASE_SECS: i64 = 15;

/// Maximum configurable lease duration in seconds (1 hour).
pub const MAX_LEASE_SECS: i64 = 3600;

/// How often an editing client renews its lease.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// How often a viewing client polls the lock status.
pub const STATUS_POLL_INTERVAL_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Lease
// ---------------------------------------------------------------------------

/// An exclusive, time-limited grant to edit one quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub quotation_id: DbId,
    pub holder_id: DbId,
    pub holder_name: String,
    pub acquired_at: Timestamp,
    pub renewed_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Per-quotation lock state as seen at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    Unlocked,
    LockedLive { holder_id: DbId },
    /// A record exists but its lease has run out. Every operation treats
    /// this exactly like [`LeaseState::Unlocked`].
    LockedExpired,
}

impl Lease {
    /// A fresh lease starting at `now`.
    pub fn grant(
        quotation_id: DbId,
        holder_id: DbId,
        holder_name: &str,
        now: Timestamp,
        duration: Duration,
    ) -> Self {
        Self {
            quotation_id,
            holder_id,
            holder_name: holder_name.to_string(),
            acquired_at: now,
            renewed_at: now,
            expires_at: now + duration,
        }
    }

    /// `true` while `now` is strictly before `expires_at`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }

    pub fn is_held_by(&self, holder_id: DbId) -> bool {
        self.holder_id == holder_id
    }

    /// Classify this record at `now`.
    pub fn state(&self, now: Timestamp) -> LeaseState {
        if self.is_live(now) {
            LeaseState::LockedLive {
                holder_id: self.holder_id,
            }
        } else {
            LeaseState::LockedExpired
        }
    }

    /// Slide the expiry forward, keeping the original acquisition time.
    fn renew(&self, now: Timestamp, duration: Duration) -> Self {
        Self {
            renewed_at: now,
            expires_at: now + duration,
            ..self.clone()
        }
    }
}

/// Classify an optional lock record at `now`.
pub fn lease_state(current: Option<&Lease>, now: Timestamp) -> LeaseState {
    current.map_or(LeaseState::Unlocked, |lease| lease.state(now))
}

/// The live lease in `current`, if any.
pub fn live_lease(current: Option<&Lease>, now: Timestamp) -> Option<&Lease> {
    current.filter(|lease| lease.is_live(now))
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Result of an acquire attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The caller now holds this lease (new grant or re-entrant renewal).
    Granted(Lease),
    /// Someone else holds this live lease. It was not modified.
    Conflict(Lease),
}

/// Result of a heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Renewed(Lease),
    /// The caller's lease is absent, expired, or owned by someone else.
    Lost,
}

/// Decide the result of `holder_id` acquiring `quotation_id` at `now`.
///
/// Re-acquiring a live lease you already hold is a renewal: the expiry
/// slides, `acquired_at` is kept, and the display name is refreshed.
pub fn decide_acquire(
    current: Option<&Lease>,
    quotation_id: DbId,
    holder_id: DbId,
    holder_name: &str,
    now: Timestamp,
    duration: Duration,
) -> AcquireOutcome {
    match live_lease(current, now) {
        Some(lease) if lease.is_held_by(holder_id) => {
            let mut renewed = lease.renew(now, duration);
            renewed.holder_name = holder_name.to_string();
            AcquireOutcome::Granted(renewed)
        }
        Some(lease) => AcquireOutcome::Conflict(lease.clone()),
        None => AcquireOutcome::Granted(Lease::grant(
            quotation_id,
            holder_id,
            holder_name,
            now,
            duration,
        )),
    }
}

/// Decide the result of a heartbeat from `holder_id` at `now`.
pub fn decide_heartbeat(
    current: Option<&Lease>,
    holder_id: DbId,
    now: Timestamp,
    duration: Duration,
) -> HeartbeatOutcome {
    match live_lease(current, now) {
        Some(lease) if lease.is_held_by(holder_id) => {
            HeartbeatOutcome::Renewed(lease.renew(now, duration))
        }
        _ => HeartbeatOutcome::Lost,
    }
}

/// Whether a release from `holder_id` should delete the current record.
///
/// A holder may always drop its own record; an expired one is already
/// equivalent to no lock, so deleting it changes nothing observable.
pub fn should_release(current: Option<&Lease>, holder_id: DbId) -> bool {
    current.is_some_and(|lease| lease.is_held_by(holder_id))
}

// ---------------------------------------------------------------------------
// Status view
// ---------------------------------------------------------------------------

/// Lock status as reported to clients.
///
/// Serialized in camelCase because the browser client consumes it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl LockStatus {
    pub fn unlocked() -> Self {
        Self {
            is_locked: false,
            locked_by: None,
            locked_by_name: None,
            locked_at: None,
            expires_at: None,
        }
    }

    /// Status for a lease the caller already knows to be live.
    pub fn from_live(lease: &Lease) -> Self {
        Self {
            is_locked: true,
            locked_by: Some(lease.holder_id),
            locked_by_name: Some(lease.holder_name.clone()),
            locked_at: Some(lease.acquired_at),
            expires_at: Some(lease.expires_at),
        }
    }
}

impl From<Option<Lease>> for LockStatus {
    fn from(live: Option<Lease>) -> Self {
        live.as_ref().map_or_else(Self::unlocked, Self::from_live)
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a lease duration in seconds. Returns `Ok(())` or an error message.
pub fn validate_lease_duration(secs: i64) -> Result<(), String> {
    if secs < MIN_LEASE_SECS {
        return Err(format!(
            "Lease duration must be at least {MIN_LEASE_SECS} seconds, got {secs}"
        ));
    }
    if secs > MAX_LEASE_SECS {
        return Err(format!(
            "Lease duration must be at most {MAX_LEASE_SECS} seconds, got {secs}"
        ));
    }
    Ok(())
}

/// Quotation ids are positive database keys.
pub fn validate_quotation_id(quotation_id: DbId) -> Result<(), String> {
    if quotation_id <= 0 {
        return Err(format!(
            "quotation_id must be positive, got {quotation_id}"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
