//! Audit log reads.
//!
//! The audit table is append-only: writes happen inside the staging
//! upsert transaction, this module only queries history.

use crate::error::DbError;
use crate::models::AuditEntry;
use crate::pool::DbPool;
use crate::schema::audit_table;
use relink_core::{EntityType, LegacyId, RunId};

/// Read access to the reconciliation audit trail.
#[derive(Debug, Clone)]
pub struct AuditLog {
    pool: DbPool,
    schema: String,
}

impl AuditLog {
    /// Audit reader over the given pool and staging schema.
    #[must_use]
    pub fn new(pool: DbPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Full history of one legacy record, oldest first.
    pub async fn by_legacy_id(
        &self,
        entity: EntityType,
        legacy_id: LegacyId,
    ) -> Result<Vec<AuditEntry>, DbError> {
        let audit = audit_table(&self.schema);
        sqlx::query_as::<_, AuditEntry>(&format!(
            r"
            SELECT * FROM {audit}
            WHERE entity_type = $1 AND legacy_id = $2
            ORDER BY recorded_at
            "
        ))
        .bind(entity.as_str())
        .bind(legacy_id.as_i64())
        .fetch_all(self.pool.inner())
        .await
        .map_err(DbError::QueryFailed)
    }

    /// Every transition recorded by one run.
    pub async fn by_run(&self, run_id: RunId) -> Result<Vec<AuditEntry>, DbError> {
        let audit = audit_table(&self.schema);
        sqlx::query_as::<_, AuditEntry>(&format!(
            "SELECT * FROM {audit} WHERE run_id = $1 ORDER BY recorded_at"
        ))
        .bind(run_id.as_uuid())
        .fetch_all(self.pool.inner())
        .await
        .map_err(DbError::QueryFailed)
    }
}
