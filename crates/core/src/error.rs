use crate::types::{DbId, Timestamp};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Another holder has a live lease on the quotation.
    #[error("Quotation is being edited by {holder_name}")]
    LockConflict {
        holder_id: DbId,
        holder_name: String,
        locked_at: Timestamp,
    },

    /// The caller's lease expired or was taken over.
    #[error("Lock on quotation {quotation_id} is no longer held")]
    LockLost { quotation_id: DbId },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}
