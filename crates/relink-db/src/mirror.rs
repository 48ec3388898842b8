//! Target-system mirror reads.
//!
//! The cloud CRM is mirrored into per-entity tables by a separate sync
//! job; reconciliation only ever reads the mirror. Row structs are raw
//! integers as stored, converted to the typed schemas at the boundary.

use crate::error::DbError;
use crate::pool::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relink_core::{
    EntityType, LegacyId, ReconcileResult, TargetCommunication, TargetDeal, TargetId,
    TargetOrganization, TargetPerson, TargetSupportCase,
};
use relink_recon::TargetMirror;
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::instrument;

/// Read access to the mirrored target-system tables.
#[derive(Debug, Clone)]
pub struct MirrorRepository {
    pool: DbPool,
    schema: String,
}

impl MirrorRepository {
    /// Repository over the given pool and mirror schema.
    #[must_use]
    pub fn new(pool: DbPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    #[instrument(skip(self), fields(entity_type = %entity))]
    async fn fetch_all<R>(&self, entity: EntityType) -> Result<Vec<R>, DbError>
    where
        R: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let table = format!("{}.{}", self.schema, entity.plural());
        let rows = sqlx::query_as::<_, R>(&format!("SELECT * FROM {table}"))
            .fetch_all(self.pool.inner())
            .await
            .map_err(DbError::QueryFailed)?;
        tracing::debug!(entity_type = %entity, rows = rows.len(), "Loaded mirror snapshot");
        Ok(rows)
    }
}

#[async_trait]
impl TargetMirror for MirrorRepository {
    async fn organizations(&self) -> ReconcileResult<Vec<TargetOrganization>> {
        let rows: Vec<OrganizationRow> = self.fetch_all(EntityType::Organization).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn people(&self) -> ReconcileResult<Vec<TargetPerson>> {
        let rows: Vec<PersonRow> = self.fetch_all(EntityType::Person).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn deals(&self) -> ReconcileResult<Vec<TargetDeal>> {
        let rows: Vec<DealRow> = self.fetch_all(EntityType::Deal).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn support_cases(&self) -> ReconcileResult<Vec<TargetSupportCase>> {
        let rows: Vec<SupportCaseRow> = self.fetch_all(EntityType::SupportCase).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn communications(&self) -> ReconcileResult<Vec<TargetCommunication>> {
        let rows: Vec<CommunicationRow> = self.fetch_all(EntityType::Communication).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, FromRow)]
struct OrganizationRow {
    target_id: i64,
    legacy_tag: Option<i64>,
    name: Option<String>,
    domain: Option<String>,
    phone: Option<String>,
    industry: Option<String>,
    employees: Option<i64>,
    city: Option<String>,
    country: Option<String>,
}

impl From<OrganizationRow> for TargetOrganization {
    fn from(row: OrganizationRow) -> Self {
        Self {
            target_id: TargetId::new(row.target_id),
            legacy_tag: row.legacy_tag.map(LegacyId::new),
            name: row.name,
            domain: row.domain,
            phone: row.phone,
            industry: row.industry,
            employees: row.employees,
            city: row.city,
            country: row.country,
        }
    }
}

#[derive(Debug, FromRow)]
struct PersonRow {
    target_id: i64,
    legacy_tag: Option<i64>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    job_title: Option<String>,
    organization_id: Option<i64>,
}

impl From<PersonRow> for TargetPerson {
    fn from(row: PersonRow) -> Self {
        Self {
            target_id: TargetId::new(row.target_id),
            legacy_tag: row.legacy_tag.map(LegacyId::new),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            job_title: row.job_title,
            organization_id: row.organization_id.map(TargetId::new),
        }
    }
}

#[derive(Debug, FromRow)]
struct DealRow {
    target_id: i64,
    legacy_tag: Option<i64>,
    name: Option<String>,
    amount: Option<Decimal>,
    stage: Option<String>,
    close_date: Option<DateTime<Utc>>,
    organization_id: Option<i64>,
    person_id: Option<i64>,
}

impl From<DealRow> for TargetDeal {
    fn from(row: DealRow) -> Self {
        Self {
            target_id: TargetId::new(row.target_id),
            legacy_tag: row.legacy_tag.map(LegacyId::new),
            name: row.name,
            amount: row.amount,
            stage: row.stage,
            close_date: row.close_date,
            organization_id: row.organization_id.map(TargetId::new),
            person_id: row.person_id.map(TargetId::new),
        }
    }
}

#[derive(Debug, FromRow)]
struct SupportCaseRow {
    target_id: i64,
    legacy_tag: Option<i64>,
    subject: Option<String>,
    status: Option<String>,
    opened_at: Option<DateTime<Utc>>,
    organization_id: Option<i64>,
    person_id: Option<i64>,
}

impl From<SupportCaseRow> for TargetSupportCase {
    fn from(row: SupportCaseRow) -> Self {
        Self {
            target_id: TargetId::new(row.target_id),
            legacy_tag: row.legacy_tag.map(LegacyId::new),
            subject: row.subject,
            status: row.status,
            opened_at: row.opened_at,
            organization_id: row.organization_id.map(TargetId::new),
            person_id: row.person_id.map(TargetId::new),
        }
    }
}

#[derive(Debug, FromRow)]
struct CommunicationRow {
    target_id: i64,
    legacy_tag: Option<i64>,
    subject: Option<String>,
    kind: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    organization_id: Option<i64>,
    person_id: Option<i64>,
    deal_id: Option<i64>,
    case_id: Option<i64>,
}

impl From<CommunicationRow> for TargetCommunication {
    fn from(row: CommunicationRow) -> Self {
        Self {
            target_id: TargetId::new(row.target_id),
            legacy_tag: row.legacy_tag.map(LegacyId::new),
            subject: row.subject,
            kind: row.kind,
            occurred_at: row.occurred_at,
            organization_id: row.organization_id.map(TargetId::new),
            person_id: row.person_id.map(TargetId::new),
            deal_id: row.deal_id.map(TargetId::new),
            case_id: row.case_id.map(TargetId::new),
        }
    }
}
