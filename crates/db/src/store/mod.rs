//! The lock store seam between the HTTP layer and persistence.
//!
//! Handlers only see [`LockStore`]. [`PgLockStore`] is the production
//! implementation; [`MemoryLockStore`] keeps leases in process and takes its
//! time from an injected clock, which makes expiry testable without sleeping.

mod memory;
mod pg;

use async_trait::async_trait;
use studio_core::lease::{AcquireOutcome, HeartbeatOutcome, Lease};
use studio_core::types::DbId;

pub use memory::MemoryLockStore;
pub use pg::PgLockStore;

/// Errors raised by a [`LockStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// The lock changed hands between the acquire attempt and the holder
    /// lookup on every retry.
    #[error("Lock on quotation {quotation_id} changed hands during acquire")]
    Contention { quotation_id: DbId },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Lease operations on quotation edit locks.
///
/// Each method is a single atomic read-modify-write for its quotation id.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Grant, renew (same holder), or refuse (other live holder) the lock.
    async fn acquire(
        &self,
        quotation_id: DbId,
        holder_id: DbId,
        holder_name: &str,
    ) -> StoreResult<AcquireOutcome>;

    /// Extend the caller's live lease.
    async fn heartbeat(&self, quotation_id: DbId, holder_id: DbId)
        -> StoreResult<HeartbeatOutcome>;

    /// Drop the caller's lock. Returns `false` when there was nothing of
    /// theirs to release.
    async fn release(&self, quotation_id: DbId, holder_id: DbId) -> StoreResult<bool>;

    /// The live lease on a quotation, if any.
    async fn status(&self, quotation_id: DbId) -> StoreResult<Option<Lease>>;

    /// Whether the backing store is reachable.
    async fn health_check(&self) -> StoreResult<()>;
}
