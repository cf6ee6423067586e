use studio_core::types::{DbId, Timestamp};

/// Errors returned by lock endpoint calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Another user's lease is live. Non-fatal; show who holds it.
    #[error("Quotation is being edited by {holder_name}")]
    Conflict {
        holder_id: Option<DbId>,
        holder_name: String,
        locked_at: Option<Timestamp>,
    },

    /// The caller's lease expired or was taken over.
    #[error("Lock is no longer held")]
    LockLost,

    /// The request never produced a usable response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other non-success response.
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}
