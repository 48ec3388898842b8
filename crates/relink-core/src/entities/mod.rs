//! Per-entity-type record schemas.
//!
//! One module per reconciled entity type, each defining the legacy-side
//! and target-side structs plus their [`crate::record::LegacyEntity`] /
//! [`crate::record::TargetEntity`] implementations. Field sets follow
//! the legacy CRM's Bronze extract (with address data denormalized onto
//! organizations and people) and the cloud CRM's property names on the
//! target side.

pub mod communication;
pub mod deal;
pub mod organization;
pub mod person;
pub mod support_case;

pub use communication::{LegacyCommunication, TargetCommunication};
pub use deal::{LegacyDeal, TargetDeal};
pub use organization::{LegacyOrganization, TargetOrganization};
pub use person::{LegacyPerson, TargetPerson};
pub use support_case::{LegacySupportCase, TargetSupportCase};
