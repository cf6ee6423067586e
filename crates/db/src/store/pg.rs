use async_trait::async_trait;
use studio_core::lease::{AcquireOutcome, HeartbeatOutcome, Lease};
use studio_core::types::DbId;

use super::{LockStore, StoreError, StoreResult};
use crate::repositories::QuotationLockRepo;
use crate::DbPool;

/// How many times acquire retries when the conflicting holder disappears
/// before it can be read back.
const ACQUIRE_ATTEMPTS: usize = 2;

/// [`LockStore`] backed by the `quotation_locks` table.
#[derive(Clone)]
pub struct PgLockStore {
    pool: DbPool,
    lease_secs: i64,
}

impl PgLockStore {
    pub fn new(pool: DbPool, lease_secs: i64) -> Self {
        Self { pool, lease_secs }
    }
}

/// Settle an acquire whose upsert was refused, given the live lease read
/// back afterwards.
///
/// The lease may have changed hands between the two statements: if it now
/// belongs to the caller (another session of the same user took it), the
/// caller holds the lock. `None` means the lease vanished and the upsert
/// should be retried.
fn settle_refused_acquire(live: Option<Lease>, holder_id: DbId) -> Option<AcquireOutcome> {
    live.map(|lease| {
        if lease.is_held_by(holder_id) {
            AcquireOutcome::Granted(lease)
        } else {
            AcquireOutcome::Conflict(lease)
        }
    })
}

#[async_trait]
impl LockStore for PgLockStore {
    async fn acquire(
        &self,
        quotation_id: DbId,
        holder_id: DbId,
        holder_name: &str,
    ) -> StoreResult<AcquireOutcome> {
        for attempt in 1..=ACQUIRE_ATTEMPTS {
            let granted = QuotationLockRepo::acquire(
                &self.pool,
                quotation_id,
                holder_id,
                holder_name,
                self.lease_secs,
            )
            .await?;
            if let Some(row) = granted {
                return Ok(AcquireOutcome::Granted(row.into()));
            }

            let live = QuotationLockRepo::get_live(&self.pool, quotation_id)
                .await?
                .map(Lease::from);
            if let Some(outcome) = settle_refused_acquire(live, holder_id) {
                return Ok(outcome);
            }

            tracing::debug!(
                quotation_id,
                holder_id,
                attempt,
                "Lock holder vanished between acquire and lookup"
            );
        }

        Err(StoreError::Contention { quotation_id })
    }

    async fn heartbeat(
        &self,
        quotation_id: DbId,
        holder_id: DbId,
    ) -> StoreResult<HeartbeatOutcome> {
        let renewed =
            QuotationLockRepo::heartbeat(&self.pool, quotation_id, holder_id, self.lease_secs)
                .await?;
        Ok(match renewed {
            Some(row) => HeartbeatOutcome::Renewed(row.into()),
            None => HeartbeatOutcome::Lost,
        })
    }

    async fn release(&self, quotation_id: DbId, holder_id: DbId) -> StoreResult<bool> {
        Ok(QuotationLockRepo::release(&self.pool, quotation_id, holder_id).await?)
    }

    async fn status(&self, quotation_id: DbId) -> StoreResult<Option<Lease>> {
        let live = QuotationLockRepo::get_live(&self.pool, quotation_id).await?;
        Ok(live.map(Lease::from))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
