//! Bronze-layer CSV snapshots as a legacy source.
//!
//! One file per entity type (`Bronze_organizations.csv`,
//! `Bronze_people.csv`, ...) under a snapshot directory. Every cell is
//! read as text and parsed explicitly, so a single bad value surfaces
//! as a malformed record carrying the row's legacy id instead of
//! poisoning the whole file.

use crate::pipeline::LegacySource;
use crate::reconciler::SourceRecord;
use crate::source::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use relink_core::{
    EntityType, LegacyCommunication, LegacyDeal, LegacyId, LegacyOrganization, LegacyPerson,
    LegacySupportCase, MalformedRecord, ReconcileResult,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Reads legacy batches from a directory of Bronze CSV snapshots.
#[derive(Debug, Clone)]
pub struct CsvBronzeSource {
    root: PathBuf,
}

impl CsvBronzeSource {
    /// Source reading `Bronze_<plural>.csv` files under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn snapshot_path(&self, entity: EntityType) -> PathBuf {
        self.root.join(format!("Bronze_{}.csv", entity.plural()))
    }

    fn read<R, L>(
        &self,
        entity: EntityType,
        convert: fn(R) -> Result<L, MalformedRecord>,
    ) -> Result<Vec<SourceRecord<L>>, SourceError>
    where
        R: DeserializeOwned,
    {
        let path = self.snapshot_path(entity);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|err| open_error(entity, path.clone(), err))?;

        let mut records = Vec::new();
        for row in reader.deserialize::<R>() {
            match row {
                Ok(raw) => records.push(convert(raw)),
                // structurally unreadable row: id unknown, keep the batch going
                Err(err) => records.push(Err(MalformedRecord::new(
                    entity,
                    None,
                    format!("unreadable row: {err}"),
                ))),
            }
        }

        tracing::debug!(
            entity_type = %entity,
            path = %path.display(),
            rows = records.len(),
            "Read bronze snapshot"
        );
        Ok(records)
    }
}

fn open_error(entity_type: EntityType, path: PathBuf, err: csv::Error) -> SourceError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => SourceError::Io {
            entity_type,
            path,
            source,
        },
        other => SourceError::Format {
            entity_type,
            path,
            message: format!("{other:?}"),
        },
    }
}

#[async_trait]
impl LegacySource for CsvBronzeSource {
    async fn organizations(&self) -> ReconcileResult<Vec<SourceRecord<LegacyOrganization>>> {
        Ok(self.read(EntityType::Organization, convert_organization)?)
    }

    async fn people(&self) -> ReconcileResult<Vec<SourceRecord<LegacyPerson>>> {
        Ok(self.read(EntityType::Person, convert_person)?)
    }

    async fn deals(&self) -> ReconcileResult<Vec<SourceRecord<LegacyDeal>>> {
        Ok(self.read(EntityType::Deal, convert_deal)?)
    }

    async fn support_cases(&self) -> ReconcileResult<Vec<SourceRecord<LegacySupportCase>>> {
        Ok(self.read(EntityType::SupportCase, convert_support_case)?)
    }

    async fn communications(&self) -> ReconcileResult<Vec<SourceRecord<LegacyCommunication>>> {
        Ok(self.read(EntityType::Communication, convert_communication)?)
    }
}

// -- raw rows ---------------------------------------------------------
//
// Every field is optional text; parsing into the typed schema happens
// in the convert functions so parse failures carry the legacy id.

#[derive(Debug, Deserialize)]
struct OrganizationRow {
    legacy_id: Option<String>,
    name: Option<String>,
    website: Option<String>,
    phone: Option<String>,
    industry: Option<String>,
    employees: Option<String>,
    city: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonRow {
    legacy_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    mobile: Option<String>,
    job_title: Option<String>,
    organization_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DealRow {
    legacy_id: Option<String>,
    name: Option<String>,
    amount: Option<String>,
    stage: Option<String>,
    close_date: Option<String>,
    organization_id: Option<String>,
    person_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SupportCaseRow {
    legacy_id: Option<String>,
    subject: Option<String>,
    status: Option<String>,
    opened_at: Option<String>,
    organization_id: Option<String>,
    person_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommunicationRow {
    legacy_id: Option<String>,
    subject: Option<String>,
    kind: Option<String>,
    occurred_at: Option<String>,
    organization_id: Option<String>,
    person_id: Option<String>,
    deal_id: Option<String>,
    case_id: Option<String>,
}

fn convert_organization(row: OrganizationRow) -> Result<LegacyOrganization, MalformedRecord> {
    let entity = EntityType::Organization;
    let legacy_id = require_id(entity, row.legacy_id)?;
    Ok(LegacyOrganization {
        legacy_id,
        name: text(row.name).unwrap_or_default(),
        website: text(row.website),
        phone: text(row.phone),
        industry: text(row.industry),
        employees: integer(entity, legacy_id, "employees", row.employees)?,
        city: text(row.city),
        country: text(row.country),
    })
}

fn convert_person(row: PersonRow) -> Result<LegacyPerson, MalformedRecord> {
    let entity = EntityType::Person;
    let legacy_id = require_id(entity, row.legacy_id)?;
    Ok(LegacyPerson {
        legacy_id,
        first_name: text(row.first_name),
        last_name: text(row.last_name).unwrap_or_default(),
        email: text(row.email),
        phone: text(row.phone),
        mobile: text(row.mobile),
        job_title: text(row.job_title),
        organization_id: reference(entity, legacy_id, "organization_id", row.organization_id)?,
    })
}

fn convert_deal(row: DealRow) -> Result<LegacyDeal, MalformedRecord> {
    let entity = EntityType::Deal;
    let legacy_id = require_id(entity, row.legacy_id)?;
    Ok(LegacyDeal {
        legacy_id,
        name: text(row.name).unwrap_or_default(),
        amount: decimal(entity, legacy_id, "amount", row.amount)?,
        stage: text(row.stage),
        close_date: timestamp(entity, legacy_id, "close_date", row.close_date)?,
        organization_id: reference(entity, legacy_id, "organization_id", row.organization_id)?,
        person_id: reference(entity, legacy_id, "person_id", row.person_id)?,
    })
}

fn convert_support_case(row: SupportCaseRow) -> Result<LegacySupportCase, MalformedRecord> {
    let entity = EntityType::SupportCase;
    let legacy_id = require_id(entity, row.legacy_id)?;
    Ok(LegacySupportCase {
        legacy_id,
        subject: text(row.subject).unwrap_or_default(),
        status: text(row.status),
        opened_at: timestamp(entity, legacy_id, "opened_at", row.opened_at)?,
        organization_id: reference(entity, legacy_id, "organization_id", row.organization_id)?,
        person_id: reference(entity, legacy_id, "person_id", row.person_id)?,
    })
}

fn convert_communication(row: CommunicationRow) -> Result<LegacyCommunication, MalformedRecord> {
    let entity = EntityType::Communication;
    let legacy_id = require_id(entity, row.legacy_id)?;
    Ok(LegacyCommunication {
        legacy_id,
        subject: text(row.subject).unwrap_or_default(),
        kind: text(row.kind),
        occurred_at: timestamp(entity, legacy_id, "occurred_at", row.occurred_at)?,
        organization_id: reference(entity, legacy_id, "organization_id", row.organization_id)?,
        person_id: reference(entity, legacy_id, "person_id", row.person_id)?,
        deal_id: reference(entity, legacy_id, "deal_id", row.deal_id)?,
        case_id: reference(entity, legacy_id, "case_id", row.case_id)?,
    })
}

// -- field parsers ----------------------------------------------------

fn text(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.is_empty())
}

fn require_id(entity: EntityType, raw: Option<String>) -> Result<LegacyId, MalformedRecord> {
    let raw = text(raw)
        .ok_or_else(|| MalformedRecord::new(entity, None, "missing legacy_id"))?;
    let id: i64 = raw
        .parse()
        .map_err(|_| MalformedRecord::new(entity, None, format!("unparsable legacy_id {raw:?}")))?;
    Ok(LegacyId::new(id))
}

fn integer(
    entity: EntityType,
    legacy_id: LegacyId,
    field: &str,
    raw: Option<String>,
) -> Result<Option<i64>, MalformedRecord> {
    text(raw)
        .map(|value| {
            value.parse().map_err(|_| {
                MalformedRecord::new(
                    entity,
                    Some(legacy_id),
                    format!("unparsable {field} {value:?}"),
                )
            })
        })
        .transpose()
}

fn reference(
    entity: EntityType,
    legacy_id: LegacyId,
    field: &str,
    raw: Option<String>,
) -> Result<Option<LegacyId>, MalformedRecord> {
    Ok(integer(entity, legacy_id, field, raw)?.map(LegacyId::new))
}

fn decimal(
    entity: EntityType,
    legacy_id: LegacyId,
    field: &str,
    raw: Option<String>,
) -> Result<Option<Decimal>, MalformedRecord> {
    text(raw)
        .map(|value| {
            Decimal::from_str(&value).map_err(|_| {
                MalformedRecord::new(
                    entity,
                    Some(legacy_id),
                    format!("unparsable {field} {value:?}"),
                )
            })
        })
        .transpose()
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
fn timestamp(
    entity: EntityType,
    legacy_id: LegacyId,
    field: &str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, MalformedRecord> {
    text(raw)
        .map(|value| {
            if let Ok(instant) = DateTime::parse_from_rfc3339(&value) {
                return Ok(instant.with_timezone(&Utc));
            }
            if let Ok(date) = NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
                if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                    return Ok(midnight.and_utc());
                }
            }
            Err(MalformedRecord::new(
                entity,
                Some(legacy_id),
                format!("unparsable {field} {value:?}"),
            ))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn snapshot_dir(entity: EntityType, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(format!("Bronze_{}.csv", entity.plural())),
            content,
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn reads_organizations_with_partial_cells() {
        let dir = snapshot_dir(
            EntityType::Organization,
            "legacy_id,name,website,phone,industry,employees,city,country\n\
             101,Acme Inc,acme.com,+41 22 555 01 02,Manufacturing,250,Geneva,CH\n\
             102,Globex,,,,,,\n",
        );
        let source = CsvBronzeSource::new(dir.path());
        let records = source.organizations().await.unwrap();
        assert_eq!(records.len(), 2);

        let acme = records[0].as_ref().unwrap();
        assert_eq!(acme.legacy_id, LegacyId::new(101));
        assert_eq!(acme.employees, Some(250));

        let globex = records[1].as_ref().unwrap();
        assert_eq!(globex.phone, None);
        assert_eq!(globex.employees, None);
    }

    #[tokio::test]
    async fn bad_cell_is_malformed_with_id_preserved() {
        let dir = snapshot_dir(
            EntityType::Organization,
            "legacy_id,name,employees\n101,Acme,many\n",
        );
        let source = CsvBronzeSource::new(dir.path());
        let records = source.organizations().await.unwrap();
        let err = records[0].as_ref().unwrap_err();
        assert_eq!(err.legacy_id, Some(LegacyId::new(101)));
        assert!(err.reason.contains("employees"));
    }

    #[tokio::test]
    async fn missing_id_is_malformed_without_id() {
        let dir = snapshot_dir(EntityType::Organization, "legacy_id,name\n,Acme\n");
        let source = CsvBronzeSource::new(dir.path());
        let records = source.organizations().await.unwrap();
        let err = records[0].as_ref().unwrap_err();
        assert_eq!(err.legacy_id, None);
        assert_eq!(err.reason, "missing legacy_id");
    }

    #[tokio::test]
    async fn missing_file_is_a_source_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvBronzeSource::new(dir.path());
        let err = source.organizations().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn deal_dates_accept_bare_dates() {
        let dir = snapshot_dir(
            EntityType::Deal,
            "legacy_id,name,amount,stage,close_date\n\
             300,Fab expansion,125000.00,negotiation,2026-03-31\n",
        );
        let source = CsvBronzeSource::new(dir.path());
        let records = source.deals().await.unwrap();
        let deal = records[0].as_ref().unwrap();
        assert_eq!(deal.amount, Some(Decimal::new(125_000_00, 2)));
        assert_eq!(
            deal.close_date.unwrap().to_rfc3339(),
            "2026-03-31T00:00:00+00:00"
        );
    }
}
