//! Staging schema bootstrap.
//!
//! Idempotent DDL: every statement is `IF NOT EXISTS`, so bootstrap is
//! safe to run on every startup. One staging table per entity type plus
//! the append-only audit log.

use crate::error::DbError;
use crate::pool::DbPool;
use relink_core::EntityType;

/// Fully qualified staging table name for an entity type.
///
/// Identifiers come from the fixed [`EntityType`] vocabulary, never
/// from input.
#[must_use]
pub fn staging_table(schema: &str, entity: EntityType) -> String {
    format!("{schema}.{}_reconciliation", entity.as_str())
}

/// Fully qualified audit table name.
#[must_use]
pub fn audit_table(schema: &str) -> String {
    format!("{schema}.reconciliation_audit")
}

/// Create the staging schema, per-entity staging tables and the audit
/// log if they do not exist yet.
pub async fn create_all(pool: &DbPool, schema: &str) -> Result<(), DbError> {
    tracing::info!(schema, "Bootstrapping staging schema");

    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
        .execute(pool.inner())
        .await
        .map_err(DbError::SchemaFailed)?;

    for entity in EntityType::ALL {
        let table = staging_table(schema, entity);
        sqlx::query(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                legacy_id BIGINT NOT NULL UNIQUE,
                target_id BIGINT,
                status TEXT NOT NULL,
                confidence DOUBLE PRECISION NOT NULL DEFAULT 0,
                match_basis TEXT NOT NULL DEFAULT 'none',
                properties_to_update JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                conflicts TEXT[] NOT NULL DEFAULT '{{}}',
                candidate_ids BIGINT[] NOT NULL DEFAULT '{{}}',
                error_message TEXT,
                legacy_snapshot JSONB,
                run_id UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "
        ))
        .execute(pool.inner())
        .await
        .map_err(DbError::SchemaFailed)?;

        let name = entity.as_str();
        for (suffix, column) in [("status", "status"), ("run", "run_id")] {
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{name}_recon_{suffix} ON {table} ({column})"
            ))
            .execute(pool.inner())
            .await
            .map_err(DbError::SchemaFailed)?;
        }
    }

    let audit = audit_table(schema);
    sqlx::query(&format!(
        r"
        CREATE TABLE IF NOT EXISTS {audit} (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            entity_type TEXT NOT NULL,
            legacy_id BIGINT NOT NULL,
            run_id UUID NOT NULL,
            previous_status TEXT,
            previous_confidence DOUBLE PRECISION,
            new_status TEXT NOT NULL,
            target_id BIGINT,
            confidence DOUBLE PRECISION NOT NULL DEFAULT 0,
            recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "
    ))
    .execute(pool.inner())
    .await
    .map_err(DbError::SchemaFailed)?;

    for (suffix, columns) in [("record", "entity_type, legacy_id"), ("run", "run_id")] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_recon_audit_{suffix} ON {audit} ({columns})"
        ))
        .execute(pool.inner())
        .await
        .map_err(DbError::SchemaFailed)?;
    }

    tracing::info!(schema, "Staging schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_schema_qualified() {
        assert_eq!(
            staging_table("staging", EntityType::SupportCase),
            "staging.support_case_reconciliation"
        );
        assert_eq!(audit_table("staging"), "staging.reconciliation_audit");
    }
}
