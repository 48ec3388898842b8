//! # Reconciliation Engine
//!
//! Decides, for each legacy CRM record, whether a record in the target
//! system represents the same real-world entity, scores the decision,
//! and produces idempotent staging outcomes for downstream update jobs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     PipelineCoordinator                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌────────────┐   ┌───────────────┐   ┌───────────────────┐     │
//! │  │ Legacy     │──►│ CandidateIndex│──►│ Matcher cascade   │     │
//! │  │ Source     │   │ (build once)  │   │ tag → contact/name│     │
//! │  └────────────┘   └───────────────┘   └─────────┬─────────┘     │
//! │                                                 │               │
//! │  ┌────────────┐   ┌───────────────┐   ┌─────────▼─────────┐     │
//! │  │ Target     │──►│ Reconciler    │──►│ StagingSink       │     │
//! │  │ Mirror     │   │ (batch fold)  │   │ (upsert + audit)  │     │
//! │  └────────────┘   └───────────────┘   └───────────────────┘     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The matcher and reconciler are pure and synchronous: one record's
//! outcome depends only on that record and the frozen [`CandidateIndex`],
//! so per-record matching is safe to spread across worker threads.
//! I/O happens at the seams: [`LegacySource`], [`TargetMirror`] and
//! [`StagingSink`] are async traits implemented by the storage crate.

pub mod index;
pub mod matcher;
pub mod pipeline;
pub mod reconciler;
pub mod source;
pub mod stats;

pub use index::CandidateIndex;
pub use matcher::{match_record, MatchResult, MatcherConfig};
pub use pipeline::{
    AbortHandle, LegacySource, PipelineCoordinator, PipelineError, PipelineOptions, StagingSink,
    TargetMirror, WriteStats,
};
pub use reconciler::{reconcile_batch, ReconcileOptions, SourceRecord};
pub use source::{csv::CsvBronzeSource, SourceError};
pub use stats::{BatchStats, EntitySummary, RunStats};
