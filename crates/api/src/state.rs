use std::sync::Arc;

use studio_db::store::LockStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Quotation lock store (Postgres in production, in-memory in tests).
    pub locks: Arc<dyn LockStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
