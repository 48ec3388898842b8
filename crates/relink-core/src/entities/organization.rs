//! Organization (company) schema.
//!
//! Root of the entity graph: everything else hangs off an organization.
//! Organization names carry legal-form noise ("Acme" vs "Acme Inc"), so
//! the matching key is the suffix-stripped normalized name; contact
//! matching uses the main phone line since organizations rarely have a
//! stable email.

use crate::diff::{DiffBuilder, DiffPolicy, FieldDiff};
use crate::entity::EntityType;
use crate::error::MalformedRecord;
use crate::ids::{LegacyId, TargetId};
use crate::normalize;
use crate::record::{LegacyEntity, ParentLinks, TargetEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An organization row from the Bronze layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyOrganization {
    /// Source-system primary key.
    pub legacy_id: LegacyId,
    /// Company name.
    pub name: String,
    /// Web site / domain.
    pub website: Option<String>,
    /// Main phone line.
    pub phone: Option<String>,
    /// Industry sector.
    pub industry: Option<String>,
    /// Employee count.
    pub employees: Option<i64>,
    /// City from the denormalized primary address.
    pub city: Option<String>,
    /// Country from the denormalized primary address.
    pub country: Option<String>,
}

/// An organization row from the target mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetOrganization {
    /// Target-system record id.
    pub target_id: TargetId,
    /// Stored legacy id from a prior successful reconciliation.
    pub legacy_tag: Option<LegacyId>,
    /// Company name.
    pub name: Option<String>,
    /// Primary domain.
    pub domain: Option<String>,
    /// Main phone line.
    pub phone: Option<String>,
    /// Industry sector.
    pub industry: Option<String>,
    /// Employee count.
    pub employees: Option<i64>,
    /// City.
    pub city: Option<String>,
    /// Country.
    pub country: Option<String>,
}

impl LegacyEntity for LegacyOrganization {
    type Target = TargetOrganization;

    const ENTITY_TYPE: EntityType = EntityType::Organization;

    fn legacy_id(&self) -> LegacyId {
        self.legacy_id
    }

    fn name_key(&self) -> Option<String> {
        normalize::name_key(&self.name)
    }

    fn contact_key(&self) -> Option<String> {
        normalize::contact_key(None, self.phone.as_deref())
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
                "empty organization name",
            ));
        }
        Ok(())
    }

    fn diff(&self, target: &Self::Target, policy: &DiffPolicy, _parents: &ParentLinks) -> FieldDiff {
        DiffBuilder::new(policy)
            .text("name", Some(&self.name), target.name.as_deref())
            .text("domain", self.website.as_deref(), target.domain.as_deref())
            .text("phone", self.phone.as_deref(), target.phone.as_deref())
            .text(
                "industry",
                self.industry.as_deref(),
                target.industry.as_deref(),
            )
            .integer("numberofemployees", self.employees, target.employees)
            .text("city", self.city.as_deref(), target.city.as_deref())
            .text("country", self.country.as_deref(), target.country.as_deref())
            .finish()
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl TargetEntity for TargetOrganization {
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
        normalize::contact_key(None, self.phone.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn legacy(name: &str) -> LegacyOrganization {
        LegacyOrganization {
            legacy_id: LegacyId::new(101),
            name: name.to_string(),
            website: None,
            phone: None,
            industry: None,
            employees: None,
            city: None,
            country: None,
        }
    }

    fn target(name: &str) -> TargetOrganization {
        TargetOrganization {
            target_id: TargetId::new(9),
            legacy_tag: None,
            name: Some(name.to_string()),
            domain: None,
            phone: None,
            industry: None,
            employees: None,
            city: None,
            country: None,
        }
    }

    #[test]
    fn suffix_stripped_name_keys_match() {
        assert_eq!(
            legacy("Acme Inc").name_key(),
            target("Acme Corporation").name_key()
        );
    }

    #[test]
    fn diff_is_literal_even_when_keys_match() {
        // "Acme Corp" and "ACME CORP" match on normalized keys, but the
        // default diff policy is case-sensitive, so the literal legacy
        // value is staged as an update.
        let diff = legacy("Acme Corp").diff(
            &target("ACME CORP"),
            &DiffPolicy::default(),
            &ParentLinks::new(),
        );
        assert_eq!(diff.properties_to_update["name"], "Acme Corp");
    }

    #[test]
    fn validate_rejects_empty_name() {
        assert!(legacy("  ").validate().is_err());
        assert!(legacy("Acme").validate().is_ok());
    }

    #[test]
    fn snapshot_carries_source_fields() {
        let snap = legacy("Acme").snapshot();
        assert_eq!(snap["legacy_id"], 101);
        assert_eq!(snap["name"], "Acme");
    }
}
