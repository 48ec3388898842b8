//! Batch reconciliation.
//!
//! A pure per-record fold over one entity type's legacy batch: each
//! record's outcome depends only on that record and the frozen
//! [`CandidateIndex`], so there is no shared mutable state to protect.
//! Malformed records become `error`-classified outcomes and never abort
//! the batch.

use crate::index::CandidateIndex;
use crate::matcher::{match_record, MatchResult, MatcherConfig};
use crate::stats::BatchStats;
use relink_core::{
    DiffPolicy, LegacyEntity, MalformedRecord, MatchBasis, ParentLinks, ReconciliationStatus,
};
use serde_json::{Map, Value};

/// One record as delivered by a legacy source: parsed, or malformed
/// with whatever identifying detail could be salvaged.
pub type SourceRecord<L> = Result<L, MalformedRecord>;

/// Options for one entity batch.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Cap on the number of legacy records processed (staged rollout).
    pub limit: Option<usize>,
    /// Compute outcomes but skip staging writes.
    pub dry_run: bool,
    /// Confidence tiers.
    pub matcher: MatcherConfig,
    /// Conflict policy for the field diff.
    pub policy: DiffPolicy,
    /// Staged parent mapping for foreign-key resolution.
    pub parents: ParentLinks,
}

/// Reconcile one entity type's batch against the candidate index.
///
/// Returns every record's outcome (including error classifications)
/// plus batch counters.
pub fn reconcile_batch<L: LegacyEntity>(
    records: Vec<SourceRecord<L>>,
    index: &CandidateIndex<L::Target>,
    options: &ReconcileOptions,
) -> (Vec<MatchResult>, BatchStats) {
    let mut stats = BatchStats::new();
    let mut results = Vec::new();

    let take = options.limit.unwrap_or(usize::MAX);
    for source_record in records.into_iter().take(take) {
        let result = match source_record {
            Ok(record) => match record.validate() {
                Ok(()) => match_record(
                    &record,
                    index,
                    &options.matcher,
                    &options.policy,
                    &options.parents,
                ),
                Err(malformed) => error_result(&malformed, record.snapshot()),
            },
            Err(malformed) => error_result(&malformed, Value::Null),
        };

        stats.record(result.status, result.confidence, result.legacy_id);
        results.push(result);
    }

    tracing::info!(
        entity_type = %L::ENTITY_TYPE,
        total = stats.total,
        matched = stats.matched,
        new = stats.new,
        conflict = stats.conflict,
        ambiguous = stats.ambiguous,
        error = stats.error,
        "Reconciled batch"
    );

    (results, stats)
}

fn error_result(malformed: &MalformedRecord, snapshot: Value) -> MatchResult {
    tracing::warn!(
        entity_type = %malformed.entity_type,
        legacy_id = ?malformed.legacy_id,
        reason = %malformed.reason,
        "Malformed legacy record classified as error"
    );
    MatchResult {
        // Records whose id could not be read stage under id 0; the row
        // is unusable for updates either way and exists for audit.
        legacy_id: malformed.legacy_id.unwrap_or_else(|| relink_core::LegacyId::new(0)),
        status: ReconciliationStatus::Error,
        target_id: None,
        confidence: 0.0,
        basis: MatchBasis::None,
        properties_to_update: Map::new(),
        conflicts: Vec::new(),
        candidate_ids: Vec::new(),
        error: Some(malformed.reason.clone()),
        legacy_snapshot: snapshot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relink_core::{EntityType, LegacyId, LegacyOrganization, TargetId, TargetOrganization};

    fn legacy(legacy_id: i64, name: &str) -> LegacyOrganization {
        LegacyOrganization {
            legacy_id: LegacyId::new(legacy_id),
            name: name.to_string(),
            website: None,
            phone: None,
            industry: None,
            employees: None,
            city: None,
            country: None,
        }
    }

    fn target(target_id: i64, legacy_tag: Option<i64>, name: &str) -> TargetOrganization {
        TargetOrganization {
            target_id: TargetId::new(target_id),
            legacy_tag: legacy_tag.map(LegacyId::new),
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
    fn fold_classifies_each_record_independently() {
        let index = CandidateIndex::build(vec![
            target(1, Some(10), "Tagged"),
            target(2, None, "Acme"),
            target(3, None, "Initech"),
            target(4, None, "Initech"),
        ]);
        let records: Vec<SourceRecord<LegacyOrganization>> = vec![
            Ok(legacy(10, "Tagged")),
            Ok(legacy(11, "Acme Inc")),
            Ok(legacy(12, "Unseen Company")),
            Ok(legacy(13, "Initech")),
            Err(MalformedRecord::new(
                EntityType::Organization,
                Some(LegacyId::new(14)),
                "unparsable employee count",
            )),
        ];

        let (results, stats) = reconcile_batch(records, &index, &ReconcileOptions::default());

        assert_eq!(results.len(), 5);
        assert_eq!(stats.matched, 2);
        assert_eq!(stats.new, 1);
        assert_eq!(stats.ambiguous, 1);
        assert_eq!(stats.error, 1);
        assert_eq!(stats.ambiguous_legacy_ids, vec![LegacyId::new(13)]);

        let errored = &results[4];
        assert_eq!(errored.status, ReconciliationStatus::Error);
        assert_eq!(errored.legacy_id, LegacyId::new(14));
        assert_eq!(errored.error.as_deref(), Some("unparsable employee count"));
    }

    #[test]
    fn limit_caps_processing() {
        let index = CandidateIndex::build(Vec::<TargetOrganization>::new());
        let records: Vec<SourceRecord<LegacyOrganization>> =
            (1..=10).map(|i| Ok(legacy(i, "Acme"))).collect();

        let options = ReconcileOptions {
            limit: Some(3),
            ..Default::default()
        };
        let (results, stats) = reconcile_batch(records, &index, &options);
        assert_eq!(results.len(), 3);
        assert_eq!(stats.total, 3);
    }

    #[test]
    fn invalid_record_is_error_not_panic() {
        let index = CandidateIndex::build(Vec::<TargetOrganization>::new());
        let records: Vec<SourceRecord<LegacyOrganization>> = vec![Ok(legacy(20, "   "))];
        let (results, stats) = reconcile_batch(records, &index, &ReconcileOptions::default());
        assert_eq!(stats.error, 1);
        assert_eq!(results[0].status, ReconciliationStatus::Error);
        // snapshot of the parsed record is still preserved
        assert_eq!(results[0].legacy_snapshot["legacy_id"], 20);
    }

    #[test]
    fn reruns_produce_identical_outcomes() {
        let index = CandidateIndex::build(vec![target(2, None, "Acme")]);
        let records = || -> Vec<SourceRecord<LegacyOrganization>> {
            vec![Ok(legacy(11, "Acme Inc"))]
        };
        let (first, _) = reconcile_batch(records(), &index, &ReconcileOptions::default());
        let (second, _) = reconcile_batch(records(), &index, &ReconcileOptions::default());
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
