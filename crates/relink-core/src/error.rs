//! Error taxonomy for reconciliation.
//!
//! Record-scoped failures ([`MalformedRecord`], non-transient staging
//! write failures) are recovered locally as `error`-classified rows and
//! never abort a batch. Batch-scoped failures (connectivity) always
//! escalate and stop the coordinator.

use crate::entity::EntityType;
use crate::ids::LegacyId;
use thiserror::Error;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Cannot reach the legacy source or the target store. Fatal for the
    /// current run; bounded reconnect attempts happen below this layer.
    #[error("Connectivity failure ({context}): {message}")]
    Connectivity {
        /// What we were talking to when the connection failed.
        context: String,
        /// Underlying driver message.
        message: String,
    },

    /// A legacy record that cannot be processed.
    #[error(transparent)]
    Malformed(#[from] MalformedRecord),

    /// A staging upsert failed after bounded retries.
    #[error("Staging write failed for {entity_type} {legacy_id}: {message}")]
    StagingWrite {
        entity_type: EntityType,
        legacy_id: LegacyId,
        message: String,
    },

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ReconcileError {
    /// Whether this error stops the whole run (as opposed to a single record).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconcileError::Connectivity { .. } | ReconcileError::Configuration(_)
        )
    }
}

/// A legacy record missing its id or carrying an unparsable value.
///
/// Recovered per record: the batch continues and the record is staged
/// with an `error` classification when its id is known.
#[derive(Debug, Clone, Error)]
#[error("Malformed {entity_type} record{}: {reason}", legacy_id.map(|id| format!(" {id}")).unwrap_or_default())]
pub struct MalformedRecord {
    /// Entity type of the offending record.
    pub entity_type: EntityType,
    /// Legacy id, when it could be read at all.
    pub legacy_id: Option<LegacyId>,
    /// Human-readable parse or validation failure.
    pub reason: String,
}

impl MalformedRecord {
    /// Create a malformed-record error.
    pub fn new(
        entity_type: EntityType,
        legacy_id: Option<LegacyId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            entity_type,
            legacy_id,
            reason: reason.into(),
        }
    }
}
