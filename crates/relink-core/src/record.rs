//! The comparable-record capability.
//!
//! Every reconciled entity type provides a legacy-side and a target-side
//! schema. The traits here are the seam the candidate index, matcher and
//! reconciler are generic over; implementations live in [`crate::entities`].

use crate::diff::{DiffPolicy, FieldDiff};
use crate::entity::EntityType;
use crate::error::MalformedRecord;
use crate::ids::{LegacyId, TargetId};
use serde_json::Value;
use std::collections::HashMap;

/// One row from the Bronze layer for a given entity type.
///
/// Records are immutable once read; all methods take `&self`.
pub trait LegacyEntity: Send + Sync {
    /// The target-side schema this entity reconciles against.
    type Target: TargetEntity;

    /// Entity type of this schema.
    const ENTITY_TYPE: EntityType;

    /// Entity-type-scoped primary key from the source system.
    fn legacy_id(&self) -> LegacyId;

    /// Normalized name key for fuzzy matching, if the record has a name.
    fn name_key(&self) -> Option<String>;

    /// Normalized email-or-phone key, if the record has contact data.
    fn contact_key(&self) -> Option<String>;

    /// Validate business invariants not expressible in the schema.
    ///
    /// Called once per record before matching; a failure classifies the
    /// record as `error` without aborting the batch.
    fn validate(&self) -> Result<(), MalformedRecord> {
        if self.legacy_id().is_valid() {
            Ok(())
        } else {
            Err(MalformedRecord::new(
                Self::ENTITY_TYPE,
                None,
                "missing or non-positive legacy_id",
            ))
        }
    }

    /// Field-level diff against a matched target record.
    ///
    /// Target-side foreign keys are resolved through `parents`, the
    /// already-staged mapping of parent entity types.
    fn diff(&self, target: &Self::Target, policy: &DiffPolicy, parents: &ParentLinks) -> FieldDiff;

    /// JSON snapshot of the legacy record, persisted alongside the
    /// staging row for audit purposes.
    fn snapshot(&self) -> Value;
}

/// One row from the target system's mirrored table.
///
/// Immutable snapshot for the duration of one reconciliation run.
pub trait TargetEntity: Send + Sync {
    /// Target-system record id.
    fn target_id(&self) -> TargetId;

    /// The target system's stored reference to a legacy id, written by a
    /// prior successful reconciliation run.
    fn legacy_tag(&self) -> Option<LegacyId>;

    /// Normalized name key, if the record has a name.
    fn name_key(&self) -> Option<String>;

    /// Normalized email-or-phone key, if the record has contact data.
    fn contact_key(&self) -> Option<String>;
}

/// Staged legacy→target id mapping of already-reconciled parent types.
///
/// Child entity types consult this to resolve the target-side foreign
/// key for a legacy parent reference (e.g. a deal's organization).
#[derive(Debug, Clone, Default)]
pub struct ParentLinks {
    links: HashMap<(EntityType, LegacyId), TargetId>,
}

impl ParentLinks {
    /// Empty mapping (root entity types, or dry bootstraps).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a staged link.
    pub fn insert(&mut self, entity: EntityType, legacy: LegacyId, target: TargetId) {
        self.links.insert((entity, legacy), target);
    }

    /// Resolve a legacy parent reference to its staged target id.
    #[must_use]
    pub fn resolve(&self, entity: EntityType, legacy: LegacyId) -> Option<TargetId> {
        self.links.get(&(entity, legacy)).copied()
    }

    /// Number of links held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Merge links from another mapping (later inserts win).
    pub fn extend(&mut self, other: ParentLinks) {
        self.links.extend(other.links);
    }
}
