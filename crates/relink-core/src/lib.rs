//! # relink-core
//!
//! Shared vocabulary for the relink reconciliation engine.
//!
//! This crate defines the types every other relink crate speaks:
//! - Strongly typed record identifiers ([`LegacyId`], [`TargetId`], [`RunId`])
//! - The entity graph ([`EntityType`]) and its dependency order
//! - Per-entity-type record schemas (legacy and target sides) behind the
//!   [`LegacyEntity`] / [`TargetEntity`] capabilities
//! - Normalization rules used for candidate matching ([`normalize`])
//! - Field-level diff computation and the conflict policy ([`DiffPolicy`])
//! - The error taxonomy ([`ReconcileError`])
//!
//! Record schemas are explicit tagged structures rather than dynamic
//! field maps, so comparable-field policy and normalization rules are
//! checked at compile time.

pub mod diff;
pub mod entities;
pub mod entity;
pub mod error;
pub mod ids;
pub mod normalize;
pub mod record;
pub mod status;

pub use diff::{DiffPolicy, FieldDiff};
pub use entities::{
    LegacyCommunication, LegacyDeal, LegacyOrganization, LegacyPerson, LegacySupportCase,
    TargetCommunication, TargetDeal, TargetOrganization, TargetPerson, TargetSupportCase,
};
pub use entity::EntityType;
pub use error::{MalformedRecord, ReconcileError, ReconcileResult};
pub use ids::{LegacyId, RunId, TargetId};
pub use record::{LegacyEntity, ParentLinks, TargetEntity};
pub use status::{MatchBasis, ReconciliationStatus};
