//! Repository for the `quotation_locks` table.
//!
//! Every statement reads the database clock (`NOW()`), so lease liveness is
//! decided by the same time source no matter which API node runs the query.

use sqlx::PgPool;
use studio_core::types::DbId;

use crate::models::quotation_lock::QuotationLock;

/// Column list for `quotation_locks` queries.
const LOCK_COLUMNS: &str = "quotation_id, holder_id, holder_name, acquired_at, \
                            renewed_at, expires_at, created_at, updated_at";

/// Provides the lease operations for quotation edit locks.
pub struct QuotationLockRepo;

impl QuotationLockRepo {
    /// Attempt to take or renew the lock on a quotation.
    ///
    /// Inserts a new row, or overwrites the existing one when it has expired
    /// or already belongs to `holder_id`. A re-entrant acquire on a live lease
    /// keeps the original `acquired_at`. Returns `None` when another holder's
    /// lease is live; the existing row is left untouched in that case.
    pub async fn acquire(
        pool: &PgPool,
        quotation_id: DbId,
        holder_id: DbId,
        holder_name: &str,
        lease_secs: i64,
    ) -> Result<Option<QuotationLock>, sqlx::Error> {
        let query = format!(
            "INSERT INTO quotation_locks AS ql \
                 (quotation_id, holder_id, holder_name, acquired_at, renewed_at, expires_at) \
             VALUES ($1, $2, $3, NOW(), NOW(), NOW() + make_interval(secs => $4)) \
             ON CONFLICT (quotation_id) DO UPDATE SET \
                 holder_id = EXCLUDED.holder_id, \
                 holder_name = EXCLUDED.holder_name, \
                 acquired_at = CASE \
                     WHEN ql.holder_id = EXCLUDED.holder_id AND ql.expires_at > NOW() \
                     THEN ql.acquired_at ELSE EXCLUDED.acquired_at END, \
                 renewed_at = EXCLUDED.renewed_at, \
                 expires_at = EXCLUDED.expires_at, \
                 updated_at = NOW() \
             WHERE ql.expires_at <= NOW() OR ql.holder_id = EXCLUDED.holder_id \
             RETURNING {LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, QuotationLock>(&query)
            .bind(quotation_id)
            .bind(holder_id)
            .bind(holder_name)
            .bind(lease_secs as f64)
            .fetch_optional(pool)
            .await
    }

    /// Slide the expiry of a live lease held by `holder_id`.
    ///
    /// Returns `None` if the lease is absent, expired, or held by someone
    /// else. An expired lease is never revived.
    pub async fn heartbeat(
        pool: &PgPool,
        quotation_id: DbId,
        holder_id: DbId,
        lease_secs: i64,
    ) -> Result<Option<QuotationLock>, sqlx::Error> {
        let query = format!(
            "UPDATE quotation_locks SET \
                 renewed_at = NOW(), \
                 expires_at = NOW() + make_interval(secs => $3), \
                 updated_at = NOW() \
             WHERE quotation_id = $1 AND holder_id = $2 AND expires_at > NOW() \
             RETURNING {LOCK_COLUMNS}"
        );
        sqlx::query_as::<_, QuotationLock>(&query)
            .bind(quotation_id)
            .bind(holder_id)
            .bind(lease_secs as f64)
            .fetch_optional(pool)
            .await
    }

    /// Delete the lock row if it belongs to `holder_id`.
    ///
    /// Returns `true` if a row was deleted. Another holder's lock is never
    /// touched.
    pub async fn release(
        pool: &PgPool,
        quotation_id: DbId,
        holder_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM quotation_locks WHERE quotation_id = $1 AND holder_id = $2")
                .bind(quotation_id)
                .bind(holder_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get the live lock for a quotation, or `None` if unlocked or expired.
    pub async fn get_live(
        pool: &PgPool,
        quotation_id: DbId,
    ) -> Result<Option<QuotationLock>, sqlx::Error> {
        let query = format!(
            "SELECT {LOCK_COLUMNS} FROM quotation_locks \
             WHERE quotation_id = $1 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, QuotationLock>(&query)
            .bind(quotation_id)
            .fetch_optional(pool)
            .await
    }

    /// Get the lock row for a quotation regardless of expiry.
    pub async fn find(
        pool: &PgPool,
        quotation_id: DbId,
    ) -> Result<Option<QuotationLock>, sqlx::Error> {
        let query = format!("SELECT {LOCK_COLUMNS} FROM quotation_locks WHERE quotation_id = $1");
        sqlx::query_as::<_, QuotationLock>(&query)
            .bind(quotation_id)
            .fetch_optional(pool)
            .await
    }
}
