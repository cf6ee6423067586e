//! Domain types and rules for the studio quotation service.
//!
//! This crate has no I/O. The persistence layer (`studio-db`), the HTTP
//! server (`studio-api`) and the client (`studio-client`) all share the
//! lease constants, error taxonomy, and lock decision functions defined here.

pub mod clock;
pub mod error;
pub mod lease;
pub mod types;
