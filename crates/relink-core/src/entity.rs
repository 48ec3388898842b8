//! Entity graph of the reconciled CRM.
//!
//! The legacy CRM relates organizations 1:many to people, and both to
//! deals, support cases and communications. Children resolve their
//! target-side foreign keys through the already-staged parent mapping,
//! so entity types must be reconciled in dependency order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity types subject to reconciliation, in dependency order.
///
/// Address data is denormalized onto organization and person records in
/// the Bronze extract, so it is not a standalone type here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Companies / accounts.
    Organization,
    /// Contacts, each optionally belonging to an organization.
    Person,
    /// Sales opportunities.
    Deal,
    /// Support / service cases.
    SupportCase,
    /// Calls, emails, meetings and notes.
    Communication,
}

impl EntityType {
    /// All entity types in canonical dependency order.
    pub const ALL: [EntityType; 5] = [
        EntityType::Organization,
        EntityType::Person,
        EntityType::Deal,
        EntityType::SupportCase,
        EntityType::Communication,
    ];

    /// Entity types whose staged mapping this type consults when
    /// resolving target-side foreign keys.
    #[must_use]
    pub fn parents(&self) -> &'static [EntityType] {
        match self {
            EntityType::Organization => &[],
            EntityType::Person => &[EntityType::Organization],
            EntityType::Deal | EntityType::SupportCase => {
                &[EntityType::Organization, EntityType::Person]
            }
            EntityType::Communication => &[
                EntityType::Organization,
                EntityType::Person,
                EntityType::Deal,
                EntityType::SupportCase,
            ],
        }
    }

    /// Snake-case name, used in table names and log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Organization => "organization",
            EntityType::Person => "person",
            EntityType::Deal => "deal",
            EntityType::SupportCase => "support_case",
            EntityType::Communication => "communication",
        }
    }

    /// Plural form, used for mirror table names.
    #[must_use]
    pub fn plural(&self) -> &'static str {
        match self {
            EntityType::Organization => "organizations",
            EntityType::Person => "people",
            EntityType::Deal => "deals",
            EntityType::SupportCase => "support_cases",
            EntityType::Communication => "communications",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "organization" => Ok(EntityType::Organization),
            "person" => Ok(EntityType::Person),
            "deal" => Ok(EntityType::Deal),
            "support_case" => Ok(EntityType::SupportCase),
            "communication" => Ok(EntityType::Communication),
            _ => Err(format!("Unknown entity type: {s}")),
        }
    }
}
