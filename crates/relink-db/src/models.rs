//! Row types for the staging store.

use chrono::{DateTime, Utc};
use relink_core::{MatchBasis, ReconciliationStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One staged reconciliation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StagingRow {
    /// Row identifier.
    pub id: Uuid,
    /// Legacy record id, unique per entity table.
    pub legacy_id: i64,
    /// Matched target record, when there is one.
    pub target_id: Option<i64>,
    /// Classification, stored as text.
    pub status: String,
    /// Fixed-tier confidence.
    pub confidence: f64,
    /// Rule tier that produced the match, stored as text.
    pub match_basis: String,
    /// Field values the target should take over.
    pub properties_to_update: JsonValue,
    /// Conflicting field names.
    pub conflicts: Vec<String>,
    /// Candidate target ids for ambiguous outcomes.
    pub candidate_ids: Vec<i64>,
    /// Failure detail for error-classified rows.
    pub error_message: Option<String>,
    /// JSON snapshot of the legacy record at reconciliation time.
    pub legacy_snapshot: Option<JsonValue>,
    /// Run that last touched this row.
    pub run_id: Uuid,
    /// First time the record was staged. Preserved across reruns.
    pub created_at: DateTime<Utc>,
    /// Last time the record was staged.
    pub updated_at: DateTime<Utc>,
}

impl StagingRow {
    /// Classification as enum, `None` for unknown stored text.
    #[must_use]
    pub fn status_enum(&self) -> Option<ReconciliationStatus> {
        self.status.parse().ok()
    }

    /// Match basis as enum.
    #[must_use]
    pub fn basis_enum(&self) -> Option<MatchBasis> {
        self.match_basis.parse().ok()
    }
}

/// One append-only audit entry recording a staging transition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    /// Entry identifier.
    pub id: Uuid,
    /// Entity type of the staged record.
    pub entity_type: String,
    /// Legacy record id.
    pub legacy_id: i64,
    /// Run that produced the transition.
    pub run_id: Uuid,
    /// Status before this run, `None` for first-time staging.
    pub previous_status: Option<String>,
    /// Confidence before this run, `None` for first-time staging.
    pub previous_confidence: Option<f64>,
    /// Status after this run.
    pub new_status: String,
    /// Target record after this run.
    pub target_id: Option<i64>,
    /// Confidence after this run.
    pub confidence: f64,
    /// When the transition was recorded.
    pub recorded_at: DateTime<Utc>,
}
