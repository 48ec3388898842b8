//! Communication (call, email, meeting, note) schema.
//!
//! Communications are leaves of the entity graph and may reference any
//! of the other entity types.

use crate::diff::{DiffBuilder, DiffPolicy, FieldDiff};
use crate::entity::EntityType;
use crate::error::MalformedRecord;
use crate::ids::{LegacyId, TargetId};
use crate::normalize;
use crate::record::{LegacyEntity, ParentLinks, TargetEntity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A communication row from the Bronze layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyCommunication {
    /// Source-system primary key.
    pub legacy_id: LegacyId,
    /// Subject line.
    pub subject: String,
    /// Kind of engagement (call, email, meeting, note).
    pub kind: Option<String>,
    /// When the communication happened.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Legacy id of the associated organization.
    pub organization_id: Option<LegacyId>,
    /// Legacy id of the associated person.
    pub person_id: Option<LegacyId>,
    /// Legacy id of the associated deal.
    pub deal_id: Option<LegacyId>,
    /// Legacy id of the associated support case.
    pub case_id: Option<LegacyId>,
}

/// A communication row from the target mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetCommunication {
    /// Target-system record id.
    pub target_id: TargetId,
    /// Stored legacy id from a prior successful reconciliation.
    pub legacy_tag: Option<LegacyId>,
    /// Subject line.
    pub subject: Option<String>,
    /// Engagement kind.
    pub kind: Option<String>,
    /// Timestamp.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Target id of the associated organization.
    pub organization_id: Option<TargetId>,
    /// Target id of the associated person.
    pub person_id: Option<TargetId>,
    /// Target id of the associated deal.
    pub deal_id: Option<TargetId>,
    /// Target id of the associated support case.
    pub case_id: Option<TargetId>,
}

impl LegacyEntity for LegacyCommunication {
    type Target = TargetCommunication;

    const ENTITY_TYPE: EntityType = EntityType::Communication;

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
                "empty communication subject",
            ));
        }
        Ok(())
    }

    fn diff(&self, target: &Self::Target, policy: &DiffPolicy, parents: &ParentLinks) -> FieldDiff {
        let resolve = |entity: EntityType, id: Option<LegacyId>| {
            id.and_then(|id| parents.resolve(entity, id))
                .map(TargetId::as_i64)
        };

        DiffBuilder::new(policy)
            .text(
                "engagement_subject",
                Some(&self.subject),
                target.subject.as_deref(),
            )
            .text("engagement_type", self.kind.as_deref(), target.kind.as_deref())
            .timestamp("occurred_at", self.occurred_at, target.occurred_at)
            .integer(
                "associated_organization_id",
                resolve(EntityType::Organization, self.organization_id),
                target.organization_id.map(TargetId::as_i64),
            )
            .integer(
                "associated_person_id",
                resolve(EntityType::Person, self.person_id),
                target.person_id.map(TargetId::as_i64),
            )
            .integer(
                "associated_deal_id",
                resolve(EntityType::Deal, self.deal_id),
                target.deal_id.map(TargetId::as_i64),
            )
            .integer(
                "associated_case_id",
                resolve(EntityType::SupportCase, self.case_id),
                target.case_id.map(TargetId::as_i64),
            )
            .finish()
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl TargetEntity for TargetCommunication {
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
