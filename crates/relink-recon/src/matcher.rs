//! Tiered match cascade.
//!
//! Strategies are evaluated in order; the first decisive outcome wins:
//!
//! 1. [`legacy_tag_strategy`]: the target record tagged with this
//!    legacy id, set by a prior successful sync. Authoritative:
//!    confidence 1.0, short-circuits everything else.
//! 2. [`content_strategy`]: gathers candidates by normalized contact
//!    and normalized name. Exactly one distinct candidate is a match
//!    (0.85 via contact, 0.65 via name only); several distinct
//!    candidates are recorded for manual review, never guessed at.
//!
//! No strategy firing means the record is new to the target system.
//!
//! The tag tier existing prevents re-matching drift across runs;
//! content matching is a one-time bootstrap path for records never
//! previously linked. Confidence values are fixed tiers, not learned
//! probabilities; they are configurable, the tier ordering is not.

use crate::index::CandidateIndex;
use relink_core::{
    DiffPolicy, LegacyEntity, MatchBasis, ParentLinks, ReconciliationStatus, TargetEntity,
    TargetId,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Confidence tier per match basis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Confidence for an exact legacy-tag match.
    #[serde(default = "default_tag_confidence")]
    pub tag_confidence: f64,
    /// Confidence for a single exact-contact match.
    #[serde(default = "default_contact_confidence")]
    pub contact_confidence: f64,
    /// Confidence for a single normalized-name match.
    #[serde(default = "default_name_confidence")]
    pub name_confidence: f64,
}

fn default_tag_confidence() -> f64 {
    1.0
}

fn default_contact_confidence() -> f64 {
    0.85
}

fn default_name_confidence() -> f64 {
    0.65
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            tag_confidence: default_tag_confidence(),
            contact_confidence: default_contact_confidence(),
            name_confidence: default_name_confidence(),
        }
    }
}

/// One legacy record's reconciliation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    /// The legacy record's id.
    pub legacy_id: relink_core::LegacyId,
    /// Outcome classification.
    pub status: ReconciliationStatus,
    /// Matched target record, when there is one.
    pub target_id: Option<TargetId>,
    /// Fixed-tier confidence in [0, 1].
    pub confidence: f64,
    /// The rule tier that produced the match.
    pub basis: MatchBasis,
    /// Fields whose legacy value should be written to the target.
    pub properties_to_update: Map<String, Value>,
    /// Fields where both sides are non-null and irreconcilably differ.
    pub conflicts: Vec<String>,
    /// All candidate target ids, recorded for ambiguous outcomes.
    pub candidate_ids: Vec<TargetId>,
    /// Failure detail for error-classified records.
    pub error: Option<String>,
    /// JSON snapshot of the legacy record.
    pub legacy_snapshot: Value,
}

/// A decisive outcome from one strategy tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    /// A single candidate was identified.
    Single {
        target_id: TargetId,
        basis: MatchBasis,
    },
    /// Multiple equally plausible candidates.
    Ambiguous { candidate_ids: Vec<TargetId> },
}

/// A match strategy: a pure function over one record and the frozen
/// index. Returning `None` passes control to the next tier.
pub type MatchStrategy<L> =
    fn(&L, &CandidateIndex<<L as LegacyEntity>::Target>) -> Option<TierOutcome>;

/// Tier 1: exact lookup of the legacy id among target legacy tags.
pub fn legacy_tag_strategy<L: LegacyEntity>(
    record: &L,
    index: &CandidateIndex<L::Target>,
) -> Option<TierOutcome> {
    index
        .by_legacy_tag(record.legacy_id())
        .map(|target| TierOutcome::Single {
            target_id: target.target_id(),
            basis: MatchBasis::ExactLegacyTag,
        })
}

/// Tier 2: content heuristics over normalized contact and name keys.
///
/// Candidates are gathered across both bases for ambiguity detection;
/// a candidate found via contact keeps the stronger contact basis even
/// if it also matches by name.
pub fn content_strategy<L: LegacyEntity>(
    record: &L,
    index: &CandidateIndex<L::Target>,
) -> Option<TierOutcome> {
    let contact_key = record.contact_key();
    let name_key = record.name_key();

    let mut candidates: Vec<(TargetId, MatchBasis)> = Vec::new();
    if let Some(key) = contact_key.as_deref() {
        for target in index.by_contact_key(key) {
            candidates.push((target.target_id(), MatchBasis::ExactContact));
        }
    }
    if let Some(key) = name_key.as_deref() {
        for target in index.by_name_key(key) {
            let id = target.target_id();
            if !candidates.iter().any(|(seen, _)| *seen == id) {
                candidates.push((id, MatchBasis::NormalizedName));
            }
        }
    }

    match candidates.len() {
        0 => None,
        1 => {
            let (target_id, basis) = candidates[0];
            Some(TierOutcome::Single { target_id, basis })
        }
        _ => Some(TierOutcome::Ambiguous {
            candidate_ids: candidates.into_iter().map(|(id, _)| id).collect(),
        }),
    }
}

/// The default cascade, in tier order.
#[must_use]
pub fn default_cascade<L: LegacyEntity>() -> Vec<MatchStrategy<L>> {
    vec![legacy_tag_strategy::<L>, content_strategy::<L>]
}

/// Match one legacy record against the index and compute its field diff.
///
/// Pure with respect to shared state: the index is read-only and the
/// result depends only on the record, so batches may be processed on
/// any number of workers.
pub fn match_record<L: LegacyEntity>(
    record: &L,
    index: &CandidateIndex<L::Target>,
    config: &MatcherConfig,
    policy: &DiffPolicy,
    parents: &ParentLinks,
) -> MatchResult {
    let outcome = default_cascade::<L>()
        .into_iter()
        .find_map(|strategy| strategy(record, index));

    match outcome {
        Some(TierOutcome::Single { target_id, basis }) => {
            matched(record, index, config, policy, parents, target_id, basis)
        }
        Some(TierOutcome::Ambiguous { candidate_ids }) => {
            tracing::debug!(
                entity_type = %L::ENTITY_TYPE,
                legacy_id = %record.legacy_id(),
                candidates = candidate_ids.len(),
                "Ambiguous match recorded for manual review"
            );
            MatchResult {
                legacy_id: record.legacy_id(),
                status: ReconciliationStatus::Ambiguous,
                target_id: None,
                confidence: 0.0,
                basis: MatchBasis::None,
                properties_to_update: Map::new(),
                conflicts: Vec::new(),
                candidate_ids,
                error: None,
                legacy_snapshot: record.snapshot(),
            }
        }
        None => MatchResult {
            legacy_id: record.legacy_id(),
            status: ReconciliationStatus::New,
            target_id: None,
            confidence: 0.0,
            basis: MatchBasis::None,
            properties_to_update: Map::new(),
            conflicts: Vec::new(),
            candidate_ids: Vec::new(),
            error: None,
            legacy_snapshot: record.snapshot(),
        },
    }
}

fn matched<L: LegacyEntity>(
    record: &L,
    index: &CandidateIndex<L::Target>,
    config: &MatcherConfig,
    policy: &DiffPolicy,
    parents: &ParentLinks,
    target_id: TargetId,
    basis: MatchBasis,
) -> MatchResult {
    let confidence = match basis {
        MatchBasis::ExactLegacyTag => config.tag_confidence,
        MatchBasis::ExactContact => config.contact_confidence,
        MatchBasis::NormalizedName => config.name_confidence,
        MatchBasis::None => 0.0,
    };

    // The candidate came out of the index, so the direct lookups below
    // cannot miss; fall back to an empty diff if they somehow do.
    let target = match basis {
        MatchBasis::ExactLegacyTag => index.by_legacy_tag(record.legacy_id()),
        MatchBasis::ExactContact => record
            .contact_key()
            .and_then(|key| index.by_contact_key(&key).find(|t| t.target_id() == target_id)),
        MatchBasis::NormalizedName | MatchBasis::None => record
            .name_key()
            .and_then(|key| index.by_name_key(&key).find(|t| t.target_id() == target_id)),
    };

    let diff = target
        .map(|target| record.diff(target, policy, parents))
        .unwrap_or_default();

    let status = if diff.has_blocking_conflict {
        ReconciliationStatus::Conflict
    } else {
        ReconciliationStatus::Matched
    };

    MatchResult {
        legacy_id: record.legacy_id(),
        status,
        target_id: Some(target_id),
        confidence,
        basis,
        properties_to_update: diff.properties_to_update,
        conflicts: diff.conflicts,
        candidate_ids: Vec::new(),
        error: None,
        legacy_snapshot: record.snapshot(),
    }
}
