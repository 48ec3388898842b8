//! Support case (service ticket) schema.

use crate::diff::{DiffBuilder, DiffPolicy, FieldDiff};
use crate::entity::EntityType;
use crate::error::MalformedRecord;
use crate::ids::{LegacyId, TargetId};
use crate::normalize;
use crate::record::{LegacyEntity, ParentLinks, TargetEntity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A support case row from the Bronze layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySupportCase {
    /// Source-system primary key.
    pub legacy_id: LegacyId,
    /// Case subject line.
    pub subject: String,
    /// Case status.
    pub status: Option<String>,
    /// When the case was opened.
    pub opened_at: Option<DateTime<Utc>>,
    /// Legacy id of the reporting organization.
    pub organization_id: Option<LegacyId>,
    /// Legacy id of the reporting person.
    pub person_id: Option<LegacyId>,
}

/// A support case row from the target mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSupportCase {
    /// Target-system record id.
    pub target_id: TargetId,
    /// Stored legacy id from a prior successful reconciliation.
    pub legacy_tag: Option<LegacyId>,
    /// Subject line.
    pub subject: Option<String>,
    /// Status.
    pub status: Option<String>,
    /// Open timestamp.
    pub opened_at: Option<DateTime<Utc>>,
    /// Target id of the associated organization.
    pub organization_id: Option<TargetId>,
    /// Target id of the associated person.
    pub person_id: Option<TargetId>,
}

impl LegacyEntity for LegacySupportCase {
    type Target = TargetSupportCase;

    const ENTITY_TYPE: EntityType = EntityType::SupportCase;

    fn legacy_id(&self) -> LegacyId {
        self.legacy_id
    }

    fn name_key(&self) -> Option<String> {
        normalize::name_key(&self.subject)
    }

    fn contact_key(&self) -> Option<String> {
        None
    }

    fn validate(&self) -> Result<(), MalformedRecord> {
        if !self.legacy_id.is_valid() {
            return Err(MalformedRecord::new(
                Self::ENTITY_TYPE,
                None,
                "missing or non-positive legacy_id",
            ));
        }
        if self.subject.trim().is_empty() {
            return Err(MalformedRecord::new(
                Self::ENTITY_TYPE,
                Some(self.legacy_id),
                "empty case subject",
            ));
        }
        Ok(())
    }

    fn diff(&self, target: &Self::Target, policy: &DiffPolicy, parents: &ParentLinks) -> FieldDiff {
        let staged_org = self
            .organization_id
            .and_then(|id| parents.resolve(EntityType::Organization, id));
        let staged_person = self
            .person_id
            .and_then(|id| parents.resolve(EntityType::Person, id));

        DiffBuilder::new(policy)
            .text("subject", Some(&self.subject), target.subject.as_deref())
            .text("status", self.status.as_deref(), target.status.as_deref())
            .timestamp("opened_at", self.opened_at, target.opened_at)
            .integer(
                "associated_organization_id",
                staged_org.map(TargetId::as_i64),
                target.organization_id.map(TargetId::as_i64),
            )
            .integer(
                "associated_person_id",
                staged_person.map(TargetId::as_i64),
                target.person_id.map(TargetId::as_i64),
            )
            .finish()
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl TargetEntity for TargetSupportCase {
    fn target_id(&self) -> TargetId {
        self.target_id
    }

    fn legacy_tag(&self) -> Option<LegacyId> {
        self.legacy_tag
    }

    fn name_key(&self) -> Option<String> {
        self.subject.as_deref().and_then(normalize::name_key)
    }

    fn contact_key(&self) -> Option<String> {
        None
    }
}
