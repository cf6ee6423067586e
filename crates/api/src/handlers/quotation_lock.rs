//! Handlers for quotation edit locks.
//!
//! The lock is advisory: these endpoints tell editors who else is working on
//! a quotation, but nothing here gates writes to the quotation itself. The
//! holder is always the authenticated user.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use studio_core::error::CoreError;
use studio_core::lease::{validate_quotation_id, AcquireOutcome, HeartbeatOutcome, LockStatus};
use studio_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a release response.
#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: bool,
}

/// POST /api/v1/quotations/{id}/lock
///
/// Acquire (or re-acquire) the edit lock. Returns 409 `LOCK_CONFLICT` with
/// the current holder if someone else's lease is live.
pub async fn acquire_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(quotation_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    validate_quotation_id(quotation_id).map_err(CoreError::Validation)?;

    match state
        .locks
        .acquire(quotation_id, auth.user_id, &auth.name)
        .await?
    {
        AcquireOutcome::Granted(lease) => {
            tracing::info!(
                quotation_id,
                holder_id = auth.user_id,
                expires_at = %lease.expires_at,
                "Quotation lock acquired"
            );
            Ok(Json(DataResponse {
                data: LockStatus::from_live(&lease),
            }))
        }
        AcquireOutcome::Conflict(holder) => {
            tracing::warn!(
                quotation_id,
                requested_by = auth.user_id,
                holder_id = holder.holder_id,
                "Quotation lock held by another user"
            );
            Err(AppError::Core(CoreError::LockConflict {
                holder_id: holder.holder_id,
                holder_name: holder.holder_name,
                locked_at: holder.acquired_at,
            }))
        }
    }
}

/// PATCH /api/v1/quotations/{id}/lock
///
/// Heartbeat: extend the caller's live lease. Returns 409 `LOCK_LOST` when
/// the lease expired or belongs to someone else.
pub async fn heartbeat_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(quotation_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    validate_quotation_id(quotation_id).map_err(CoreError::Validation)?;

    match state.locks.heartbeat(quotation_id, auth.user_id).await? {
        HeartbeatOutcome::Renewed(lease) => {
            tracing::debug!(
                quotation_id,
                holder_id = auth.user_id,
                new_expires_at = %lease.expires_at,
                "Quotation lock renewed"
            );
            Ok(Json(DataResponse {
                data: LockStatus::from_live(&lease),
            }))
        }
        HeartbeatOutcome::Lost => {
            tracing::warn!(quotation_id, holder_id = auth.user_id, "Quotation lock lost");
            Err(AppError::Core(CoreError::LockLost { quotation_id }))
        }
    }
}

/// DELETE /api/v1/quotations/{id}/lock
///
/// Release the caller's lock. Releasing a lock you do not hold is a no-op
/// and still returns 200 with `released: false`.
pub async fn release_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(quotation_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    validate_quotation_id(quotation_id).map_err(CoreError::Validation)?;

    let released = state.locks.release(quotation_id, auth.user_id).await?;
    if released {
        tracing::info!(quotation_id, holder_id = auth.user_id, "Quotation lock released");
    } else {
        tracing::debug!(
            quotation_id,
            user_id = auth.user_id,
            "Release ignored, caller does not hold the lock"
        );
    }

    Ok(Json(DataResponse {
        data: ReleaseResponse { released },
    }))
}

/// GET /api/v1/quotations/{id}/lock
///
/// Report whether a live lock exists and who holds it.
pub async fn get_lock_status(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(quotation_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    validate_quotation_id(quotation_id).map_err(CoreError::Validation)?;

    let live = state.locks.status(quotation_id).await?;
    Ok(Json(DataResponse {
        data: LockStatus::from(live),
    }))
}
