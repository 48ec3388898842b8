//! Person (contact) schema.
//!
//! People match primarily by email; the name key combines given and
//! family name. The parent organization's target id is resolved through
//! the staged organization mapping.

use crate::diff::{DiffBuilder, DiffPolicy, FieldDiff};
use crate::entity::EntityType;
use crate::error::MalformedRecord;
use crate::ids::{LegacyId, TargetId};
use crate::normalize;
use crate::record::{LegacyEntity, ParentLinks, TargetEntity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A person row from the Bronze layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyPerson {
    /// Source-system primary key.
    pub legacy_id: LegacyId,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: String,
    /// Primary email address.
    pub email: Option<String>,
    /// Direct phone.
    pub phone: Option<String>,
    /// Mobile phone.
    pub mobile: Option<String>,
    /// Job title.
    pub job_title: Option<String>,
    /// Legacy id of the employing organization.
    pub organization_id: Option<LegacyId>,
}

/// A person row from the target mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPerson {
    /// Target-system record id.
    pub target_id: TargetId,
    /// Stored legacy id from a prior successful reconciliation.
    pub legacy_tag: Option<LegacyId>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Primary email address.
    pub email: Option<String>,
    /// Direct phone.
    pub phone: Option<String>,
    /// Job title.
    pub job_title: Option<String>,
    /// Target id of the associated organization.
    pub organization_id: Option<TargetId>,
}

impl LegacyPerson {
    fn full_name(&self) -> String {
        match &self.first_name {
            Some(first) => format!("{first} {}", self.last_name),
            None => self.last_name.clone(),
        }
    }
}

impl LegacyEntity for LegacyPerson {
    type Target = TargetPerson;

    const ENTITY_TYPE: EntityType = EntityType::Person;

    fn legacy_id(&self) -> LegacyId {
        self.legacy_id
    }

    fn name_key(&self) -> Option<String> {
        normalize::name_key(&self.full_name())
    }

    fn contact_key(&self) -> Option<String> {
        normalize::contact_key(
            self.email.as_deref(),
            self.phone.as_deref().or(self.mobile.as_deref()),
        )
    }

    fn validate(&self) -> Result<(), MalformedRecord> {
        if !self.legacy_id.is_valid() {
            return Err(MalformedRecord::new(
                Self::ENTITY_TYPE,
                None,
                "missing or non-positive legacy_id",
            ));
        }
        if self.last_name.trim().is_empty() {
            return Err(MalformedRecord::new(
                Self::ENTITY_TYPE,
                Some(self.legacy_id),
                "empty last name",
            ));
        }
        Ok(())
    }

    fn diff(&self, target: &Self::Target, policy: &DiffPolicy, parents: &ParentLinks) -> FieldDiff {
        let staged_org = self
            .organization_id
            .and_then(|id| parents.resolve(EntityType::Organization, id));

        DiffBuilder::new(policy)
            .text(
                "firstname",
                self.first_name.as_deref(),
                target.first_name.as_deref(),
            )
            .text(
                "lastname",
                Some(&self.last_name),
                target.last_name.as_deref(),
            )
            .text("email", self.email.as_deref(), target.email.as_deref())
            .text("phone", self.phone.as_deref(), target.phone.as_deref())
            .text(
                "jobtitle",
                self.job_title.as_deref(),
                target.job_title.as_deref(),
            )
            .integer(
                "associated_organization_id",
                staged_org.map(TargetId::as_i64),
                target.organization_id.map(TargetId::as_i64),
            )
            .finish()
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl TargetEntity for TargetPerson {
    fn target_id(&self) -> TargetId {
        self.target_id
    }

    fn legacy_tag(&self) -> Option<LegacyId> {
        self.legacy_tag
    }

    fn name_key(&self) -> Option<String> {
        let full = match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (None, Some(last)) => last.clone(),
            (Some(first), None) => first.clone(),
            (None, None) => return None,
        };
        normalize::name_key(&full)
    }

    fn contact_key(&self) -> Option<String> {
        normalize::contact_key(self.email.as_deref(), self.phone.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn legacy() -> LegacyPerson {
        LegacyPerson {
            legacy_id: LegacyId::new(200),
            first_name: Some("Ada".into()),
            last_name: "Marechal".into(),
            email: Some("Ada.Marechal@Acme.com".into()),
            phone: None,
            mobile: Some("+41 79 555 01 02".into()),
            job_title: None,
            organization_id: Some(LegacyId::new(101)),
        }
    }

    #[test]
    fn contact_key_prefers_email() {
        assert_eq!(legacy().contact_key(), Some("ada.marechal@acme.com".into()));
    }

    #[test]
    fn contact_key_falls_back_to_mobile() {
        let mut person = legacy();
        person.email = None;
        assert_eq!(person.contact_key(), Some("41795550102".into()));
    }

    #[test]
    fn parent_link_resolves_into_diff() {
        let target = TargetPerson {
            target_id: TargetId::new(7),
            legacy_tag: None,
            first_name: Some("Ada".into()),
            last_name: Some("Marechal".into()),
            email: Some("ada.marechal@acme.com".into()),
            phone: None,
            job_title: None,
            organization_id: None,
        };
        let mut parents = ParentLinks::new();
        parents.insert(EntityType::Organization, LegacyId::new(101), TargetId::new(900));

        let diff = legacy().diff(&target, &DiffPolicy::default(), &parents);
        assert_eq!(diff.properties_to_update["associated_organization_id"], 900);
    }

    #[test]
    fn unstaged_parent_produces_no_update() {
        let target = TargetPerson {
            target_id: TargetId::new(7),
            legacy_tag: None,
            first_name: Some("Ada".into()),
            last_name: Some("Marechal".into()),
            email: None,
            phone: None,
            job_title: None,
            organization_id: None,
        };
        let diff = legacy().diff(&target, &DiffPolicy::default(), &ParentLinks::new());
        assert!(!diff
            .properties_to_update
            .contains_key("associated_organization_id"));
    }

    #[test]
    fn validate_requires_last_name() {
        let mut person = legacy();
        person.last_name = " ".into();
        assert!(person.validate().is_err());
    }
}
