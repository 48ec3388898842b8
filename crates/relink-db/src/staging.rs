//! Staging writer and reader.
//!
//! Idempotent upserts keyed on `(entity type, legacy id)`: rerunning a
//! batch overwrites each row in place, `created_at` survives reruns and
//! every transition lands in the append-only audit log. Transient write
//! failures get a bounded retry; a row that still fails is counted and
//! skipped so one bad record never sinks the batch.

use crate::error::DbError;
use crate::models::StagingRow;
use crate::pool::DbPool;
use crate::schema::{audit_table, staging_table};
use async_trait::async_trait;
use relink_core::{EntityType, LegacyId, ParentLinks, ReconcileResult, ReconciliationStatus, RunId, TargetId};
use relink_recon::{MatchResult, StagingSink, WriteStats};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::instrument;

const WRITE_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// State of a staged row before an upsert touches it. Feeds both the
/// audit transition (old status/confidence) and the inserted/updated
/// counters.
enum PreviousRow {
    Absent,
    Present { status: String, confidence: f64 },
}

/// Postgres-backed staging store.
#[derive(Debug, Clone)]
pub struct StagingRepository {
    pool: DbPool,
    schema: String,
}

impl StagingRepository {
    /// Repository over the given pool and staging schema.
    #[must_use]
    pub fn new(pool: DbPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Upsert a batch of reconciliation outcomes.
    ///
    /// Each record is written in its own transaction (previous-status
    /// read, upsert, audit append), so a failure leaves no partial row.
    #[instrument(skip(self, results), fields(entity_type = %entity, run_id = %run_id, records = results.len()))]
    pub async fn upsert_batch(
        &self,
        entity: EntityType,
        run_id: RunId,
        results: &[MatchResult],
    ) -> Result<WriteStats, DbError> {
        let mut stats = WriteStats::default();

        for result in results {
            match self.upsert_one_with_retry(entity, run_id, result).await {
                Ok(PreviousRow::Absent) => stats.inserted += 1,
                Ok(PreviousRow::Present { .. }) => stats.updated += 1,
                Err(err) => {
                    tracing::warn!(
                        entity_type = %entity,
                        legacy_id = %result.legacy_id,
                        error = %err,
                        "Staging write failed; row skipped"
                    );
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(
            entity_type = %entity,
            inserted = stats.inserted,
            updated = stats.updated,
            failed = stats.failed,
            "Staged batch"
        );
        Ok(stats)
    }

    async fn upsert_one_with_retry(
        &self,
        entity: EntityType,
        run_id: RunId,
        result: &MatchResult,
    ) -> Result<PreviousRow, DbError> {
        let mut attempt = 1;
        loop {
            match self.upsert_one(entity, run_id, result).await {
                Ok(previous) => return Ok(previous),
                Err(err) if err.is_transient() && attempt < WRITE_ATTEMPTS => {
                    tracing::debug!(
                        entity_type = %entity,
                        legacy_id = %result.legacy_id,
                        attempt,
                        error = %err,
                        "Transient staging write failure; retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Returns the row's state before this write, for the audit entry
    /// and the inserted/updated split.
    async fn upsert_one(
        &self,
        entity: EntityType,
        run_id: RunId,
        result: &MatchResult,
    ) -> Result<PreviousRow, DbError> {
        let table = staging_table(&self.schema, entity);
        let audit = audit_table(&self.schema);

        let mut tx = self
            .pool
            .inner()
            .begin()
            .await
            .map_err(DbError::ConnectionFailed)?;

        let previous: Option<(String, f64)> = sqlx::query_as(&format!(
            "SELECT status, confidence FROM {table} WHERE legacy_id = $1"
        ))
        .bind(result.legacy_id.as_i64())
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::QueryFailed)?;
        let previous = match previous {
            Some((status, confidence)) => PreviousRow::Present { status, confidence },
            None => PreviousRow::Absent,
        };

        let candidate_ids: Vec<i64> = result.candidate_ids.iter().map(|id| id.as_i64()).collect();

        sqlx::query(&format!(
            r"
            INSERT INTO {table}
                (legacy_id, target_id, status, confidence, match_basis,
                 properties_to_update, conflicts, candidate_ids,
                 error_message, legacy_snapshot, run_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (legacy_id) DO UPDATE SET
                target_id = EXCLUDED.target_id,
                status = EXCLUDED.status,
                confidence = EXCLUDED.confidence,
                match_basis = EXCLUDED.match_basis,
                properties_to_update = EXCLUDED.properties_to_update,
                conflicts = EXCLUDED.conflicts,
                candidate_ids = EXCLUDED.candidate_ids,
                error_message = EXCLUDED.error_message,
                legacy_snapshot = EXCLUDED.legacy_snapshot,
                run_id = EXCLUDED.run_id,
                updated_at = now()
            "
        ))
        .bind(result.legacy_id.as_i64())
        .bind(result.target_id.map(TargetId::as_i64))
        .bind(result.status.as_str())
        .bind(result.confidence)
        .bind(result.basis.as_str())
        .bind(JsonValue::Object(result.properties_to_update.clone()))
        .bind(&result.conflicts)
        .bind(&candidate_ids)
        .bind(result.error.as_deref())
        .bind(&result.legacy_snapshot)
        .bind(run_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(DbError::QueryFailed)?;

        let (previous_status, previous_confidence) = match &previous {
            PreviousRow::Present { status, confidence } => {
                (Some(status.as_str()), Some(*confidence))
            }
            PreviousRow::Absent => (None, None),
        };

        sqlx::query(&format!(
            r"
            INSERT INTO {audit}
                (entity_type, legacy_id, run_id, previous_status,
                 previous_confidence, new_status, target_id, confidence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "
        ))
        .bind(entity.as_str())
        .bind(result.legacy_id.as_i64())
        .bind(run_id.as_uuid())
        .bind(previous_status)
        .bind(previous_confidence)
        .bind(result.status.as_str())
        .bind(result.target_id.map(TargetId::as_i64))
        .bind(result.confidence)
        .execute(&mut *tx)
        .await
        .map_err(DbError::QueryFailed)?;

        tx.commit().await.map_err(DbError::QueryFailed)?;
        Ok(previous)
    }

    /// Staged row for one legacy record, if any.
    pub async fn read_row(
        &self,
        entity: EntityType,
        legacy_id: LegacyId,
    ) -> Result<Option<StagingRow>, DbError> {
        let table = staging_table(&self.schema, entity);
        sqlx::query_as::<_, StagingRow>(&format!(
            "SELECT * FROM {table} WHERE legacy_id = $1"
        ))
        .bind(legacy_id.as_i64())
        .fetch_optional(self.pool.inner())
        .await
        .map_err(DbError::QueryFailed)
    }

    /// All staged rows with a given classification, oldest first.
    ///
    /// Backs the operator review queue for ambiguous and conflict rows.
    pub async fn rows_by_status(
        &self,
        entity: EntityType,
        status: ReconciliationStatus,
    ) -> Result<Vec<StagingRow>, DbError> {
        let table = staging_table(&self.schema, entity);
        sqlx::query_as::<_, StagingRow>(&format!(
            "SELECT * FROM {table} WHERE status = $1 ORDER BY created_at"
        ))
        .bind(status.as_str())
        .fetch_all(self.pool.inner())
        .await
        .map_err(DbError::QueryFailed)
    }

    /// Legacy-to-target links from linked staged rows.
    #[instrument(skip(self), fields(entity_type = %entity))]
    pub async fn linked_ids(&self, entity: EntityType) -> Result<ParentLinks, DbError> {
        let table = staging_table(&self.schema, entity);
        let rows: Vec<(i64, i64)> = sqlx::query_as(&format!(
            r"
            SELECT legacy_id, target_id FROM {table}
            WHERE status IN ('matched', 'conflict') AND target_id IS NOT NULL
            "
        ))
        .fetch_all(self.pool.inner())
        .await
        .map_err(DbError::QueryFailed)?;

        let mut links = ParentLinks::new();
        for (legacy_id, target_id) in rows {
            links.insert(entity, LegacyId::new(legacy_id), TargetId::new(target_id));
        }
        Ok(links)
    }
}

#[async_trait]
impl StagingSink for StagingRepository {
    async fn upsert(
        &self,
        entity: EntityType,
        run_id: RunId,
        results: &[MatchResult],
    ) -> ReconcileResult<WriteStats> {
        Ok(self.upsert_batch(entity, run_id, results).await?)
    }

    async fn parent_links(&self, entity: EntityType) -> ReconcileResult<ParentLinks> {
        Ok(self.linked_ids(entity).await?)
    }
}
