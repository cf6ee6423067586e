//! Client for the quotation lock endpoints.
//!
//! - [`LockClient`] -- one call per endpoint (acquire, heartbeat, release, status).
//! - [`EditSession`] -- holds a lock while a quotation is being edited: acquires
//!   on open, renews on a timer, and stops the timer on every exit path.
//! - [`StatusPoller`] -- polls the lock status for viewers on its own timer.

pub mod client;
pub mod error;
pub mod poller;
pub mod session;

pub use client::LockClient;
pub use error::ClientError;
pub use poller::{held_by_other, StatusPoller};
pub use session::{EditSession, SessionOptions, SessionState};
