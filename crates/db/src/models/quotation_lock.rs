//! Quotation lock row model.

use serde::Serialize;
use sqlx::FromRow;
use studio_core::lease::Lease;
use studio_core::types::{DbId, Timestamp};

/// A row from the `quotation_locks` table.
///
/// The row may describe an expired lease; use [`Lease::is_live`] after
/// converting, or query through the repository methods that filter on
/// `expires_at > NOW()`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuotationLock {
    pub quotation_id: DbId,
    pub holder_id: DbId,
    pub holder_name: String,
    pub acquired_at: Timestamp,
    pub renewed_at: Timestamp,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<QuotationLock> for Lease {
    fn from(row: QuotationLock) -> Self {
        Lease {
            quotation_id: row.quotation_id,
            holder_id: row.holder_id,
            holder_name: row.holder_name,
            acquired_at: row.acquired_at,
            renewed_at: row.renewed_at,
            expires_at: row.expires_at,
        }
    }
}
