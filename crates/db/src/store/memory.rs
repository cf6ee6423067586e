use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use studio_core::clock::{Clock, SystemClock};
use studio_core::lease::{
    decide_acquire, decide_heartbeat, live_lease, should_release, AcquireOutcome,
    HeartbeatOutcome, Lease,
};
use studio_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;

use super::{LockStore, StoreResult};

/// [`LockStore`] that keeps leases in process memory.
///
/// All quotations share one mutex; each operation holds it for a single
/// read-decide-write, so operations on the same quotation are linearizable.
#[derive(Debug)]
pub struct MemoryLockStore {
    locks: Mutex<HashMap<DbId, Lease>>,
    clock: Arc<dyn Clock>,
    lease_secs: i64,
}

impl MemoryLockStore {
    /// A store on the system clock.
    pub fn new(lease_secs: i64) -> Self {
        Self::with_clock(lease_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(lease_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            clock,
            lease_secs,
        }
    }

    fn duration(&self) -> Duration {
        Duration::seconds(self.lease_secs)
    }
}

/// Forget the quotation's lease if it has expired.
fn evict_expired(locks: &mut HashMap<DbId, Lease>, quotation_id: DbId, now: Timestamp) {
    if locks.get(&quotation_id).is_some_and(|lease| !lease.is_live(now)) {
        locks.remove(&quotation_id);
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn acquire(
        &self,
        quotation_id: DbId,
        holder_id: DbId,
        holder_name: &str,
    ) -> StoreResult<AcquireOutcome> {
        let mut locks = self.locks.lock().await;
        let outcome = decide_acquire(
            locks.get(&quotation_id),
            quotation_id,
            holder_id,
            holder_name,
            self.clock.now(),
            self.duration(),
        );
        if let AcquireOutcome::Granted(lease) = &outcome {
            locks.insert(quotation_id, lease.clone());
        }
        Ok(outcome)
    }

    async fn heartbeat(
        &self,
        quotation_id: DbId,
        holder_id: DbId,
    ) -> StoreResult<HeartbeatOutcome> {
        let mut locks = self.locks.lock().await;
        let now = self.clock.now();
        let outcome = decide_heartbeat(locks.get(&quotation_id), holder_id, now, self.duration());
        match &outcome {
            HeartbeatOutcome::Renewed(lease) => {
                locks.insert(quotation_id, lease.clone());
            }
            HeartbeatOutcome::Lost => evict_expired(&mut locks, quotation_id, now),
        }
        Ok(outcome)
    }

    async fn release(&self, quotation_id: DbId, holder_id: DbId) -> StoreResult<bool> {
        let mut locks = self.locks.lock().await;
        if should_release(locks.get(&quotation_id), holder_id) {
            locks.remove(&quotation_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn status(&self, quotation_id: DbId) -> StoreResult<Option<Lease>> {
        let mut locks = self.locks.lock().await;
        let now = self.clock.now();
        evict_expired(&mut locks, quotation_id, now);
        Ok(live_lease(locks.get(&quotation_id), now).cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
