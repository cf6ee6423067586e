pub mod health;
pub mod quotation_lock;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /quotations/{id}/lock      acquire (POST), heartbeat (PATCH),
///                            release (DELETE), status (GET)
/// ```
///
/// All routes require a Bearer token.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/quotations", quotation_lock::router())
}
