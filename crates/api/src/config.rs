use studio_core::lease::{validate_lease_duration, DEFAULT_LEASE_SECS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for closing the database pool after the server stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Quotation lock lease settings.
    pub lock: LockConfig,
}

/// Lease settings for quotation edit locks.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// How long a grant or heartbeat keeps the lock alive, in seconds.
    pub lease_secs: i64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_secs: DEFAULT_LEASE_SECS,
        }
    }
}

impl LockConfig {
    /// Load lock settings from `LOCK_LEASE_SECS` (default: `30`).
    ///
    /// # Panics
    ///
    /// Panics if the value is not an integer or falls outside the allowed
    /// lease range.
    pub fn from_env() -> Self {
        let lease_secs: i64 = std::env::var("LOCK_LEASE_SECS")
            .unwrap_or_else(|_| DEFAULT_LEASE_SECS.to_string())
            .parse()
            .expect("LOCK_LEASE_SECS must be a valid i64");

        if let Err(msg) = validate_lease_duration(lease_secs) {
            panic!("Invalid LOCK_LEASE_SECS: {msg}");
        }

        Self { lease_secs }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `LOCK_LEASE_SECS`      | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            lock: LockConfig::from_env(),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
