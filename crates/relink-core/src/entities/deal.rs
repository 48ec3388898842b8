//! Deal (opportunity) schema.
//!
//! Deals carry no contact data; matching is by legacy tag or normalized
//! deal name only. Amounts are exact decimals.

use crate::diff::{DiffBuilder, DiffPolicy, FieldDiff};
use crate::entity::EntityType;
use crate::error::MalformedRecord;
use crate::ids::{LegacyId, TargetId};
use crate::normalize;
use crate::record::{LegacyEntity, ParentLinks, TargetEntity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A deal row from the Bronze layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyDeal {
    /// Source-system primary key.
    pub legacy_id: LegacyId,
    /// Deal name / description.
    pub name: String,
    /// Forecast amount.
    pub amount: Option<Decimal>,
    /// Sales stage.
    pub stage: Option<String>,
    /// Expected close date.
    pub close_date: Option<DateTime<Utc>>,
    /// Legacy id of the primary organization.
    pub organization_id: Option<LegacyId>,
    /// Legacy id of the primary person.
    pub person_id: Option<LegacyId>,
}

/// A deal row from the target mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDeal {
    /// Target-system record id.
    pub target_id: TargetId,
    /// Stored legacy id from a prior successful reconciliation.
    pub legacy_tag: Option<LegacyId>,
    /// Deal name.
    pub name: Option<String>,
    /// Amount.
    pub amount: Option<Decimal>,
    /// Pipeline stage.
    pub stage: Option<String>,
    /// Close date.
    pub close_date: Option<DateTime<Utc>>,
    /// Target id of the associated organization.
    pub organization_id: Option<TargetId>,
    /// Target id of the primary person.
    pub person_id: Option<TargetId>,
}

impl LegacyEntity for LegacyDeal {
    type Target = TargetDeal;

    const ENTITY_TYPE: EntityType = EntityType::Deal;

    fn legacy_id(&self) -> LegacyId {
        self.legacy_id
    }

    fn name_key(&self) -> Option<String> {
        normalize::name_key(&self.name)
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
        if self.name.trim().is_empty() {
            return Err(MalformedRecord::new(
                Self::ENTITY_TYPE,
                Some(self.legacy_id),
                "empty deal name",
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
            .text("dealname", Some(&self.name), target.name.as_deref())
            .decimal("amount", self.amount, target.amount)
            .text("dealstage", self.stage.as_deref(), target.stage.as_deref())
            .timestamp("closedate", self.close_date, target.close_date)
            .integer(
                "associated_organization_id",
                staged_org.map(TargetId::as_i64),
                target.organization_id.map(TargetId::as_i64),
            )
            .integer(
                "primary_person_id",
                staged_person.map(TargetId::as_i64),
                target.person_id.map(TargetId::as_i64),
            )
            .finish()
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl TargetEntity for TargetDeal {
    fn target_id(&self) -> TargetId {
        self.target_id
    }

    fn legacy_tag(&self) -> Option<LegacyId> {
        self.legacy_tag
    }

    fn name_key(&self) -> Option<String> {
        self.name.as_deref().and_then(normalize::name_key)
    }

    fn contact_key(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn amount_diff_is_exact() {
        let legacy = LegacyDeal {
            legacy_id: LegacyId::new(300),
            name: "Fab expansion".into(),
            amount: Some(Decimal::new(125_000_00, 2)),
            stage: None,
            close_date: None,
            organization_id: None,
            person_id: None,
        };
        let target = TargetDeal {
            target_id: TargetId::new(12),
            legacy_tag: None,
            name: Some("Fab expansion".into()),
            amount: Some(Decimal::new(125_000_00, 2)),
            stage: None,
            close_date: None,
            organization_id: None,
            person_id: None,
        };
        let diff = legacy.diff(&target, &DiffPolicy::default(), &ParentLinks::new());
        assert!(diff.is_empty());
    }

    #[test]
    fn amount_serializes_as_string() {
        let legacy = LegacyDeal {
            legacy_id: LegacyId::new(300),
            name: "Fab expansion".into(),
            amount: Some(Decimal::new(99_50, 2)),
            stage: None,
            close_date: None,
            organization_id: None,
            person_id: None,
        };
        let target = TargetDeal {
            target_id: TargetId::new(12),
            legacy_tag: None,
            name: Some("Fab expansion".into()),
            amount: None,
            stage: None,
            close_date: None,
            organization_id: None,
            person_id: None,
        };
        let diff = legacy.diff(&target, &DiffPolicy::default(), &ParentLinks::new());
        assert_eq!(diff.properties_to_update["amount"], "99.50");
    }

    #[test]
    fn deals_have_no_contact_key() {
        let legacy = LegacyDeal {
            legacy_id: LegacyId::new(300),
            name: "Fab expansion".into(),
            amount: None,
            stage: None,
            close_date: None,
            organization_id: None,
            person_id: None,
        };
        assert_eq!(legacy.contact_key(), None);
    }
}
