//! Repository structs. Each exposes associated async functions taking a
//! `&PgPool`, mirroring one table.

mod quotation_lock_repo;

pub use quotation_lock_repo::QuotationLockRepo;
