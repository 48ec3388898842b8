//! # relink-db
//!
//! Postgres persistence for the relink reconciliation engine:
//!
//! - [`StagingRepository`]: idempotent staging upserts plus the
//!   append-only audit trail, implementing the engine's
//!   [`relink_recon::StagingSink`] seam
//! - [`MirrorRepository`]: reads of the mirrored target-system tables,
//!   implementing [`relink_recon::TargetMirror`]
//! - [`schema::create_all`]: idempotent staging schema bootstrap
//!
//! The mirror tables are populated by a separate sync job; this crate
//! never writes to them, and nothing here ever deletes a staged row.

pub mod audit;
pub mod config;
pub mod error;
pub mod mirror;
pub mod models;
pub mod pool;
pub mod schema;
pub mod staging;

pub use audit::AuditLog;
pub use config::DbConfig;
pub use error::DbError;
pub use mirror::MirrorRepository;
pub use models::{AuditEntry, StagingRow};
pub use pool::DbPool;
pub use staging::StagingRepository;
