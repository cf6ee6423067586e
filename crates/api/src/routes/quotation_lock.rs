//! Route definitions for quotation edit locks.

use axum::routing::post;
use axum::Router;

use crate::handlers::quotation_lock;
use crate::state::AppState;

/// Lock routes mounted at `/quotations`.
///
/// ```text
/// POST   /{id}/lock    -> acquire_lock
/// PATCH  /{id}/lock    -> heartbeat_lock
/// DELETE /{id}/lock    -> release_lock
/// GET    /{id}/lock    -> get_lock_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}/lock",
        post(quotation_lock::acquire_lock)
            .patch(quotation_lock::heartbeat_lock)
            .delete(quotation_lock::release_lock)
            .get(quotation_lock::get_lock_status),
    )
}
