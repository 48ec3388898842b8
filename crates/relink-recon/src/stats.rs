//! Run and batch statistics.

use crate::pipeline::WriteStats;
use relink_core::{EntityType, LegacyId, ReconciliationStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters for one entity batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Records processed (including errored ones).
    pub total: u32,
    /// Matched records.
    pub matched: u32,
    /// Records new to the target system.
    pub new: u32,
    /// Blocking-conflict records.
    pub conflict: u32,
    /// Ambiguous records awaiting manual review.
    pub ambiguous: u32,
    /// Error-classified records (data quality, not system failure).
    pub error: u32,
    /// Sum of confidence over matched records, for the average.
    sum_matched_confidence: f64,
    /// Legacy ids left for operator follow-up.
    pub ambiguous_legacy_ids: Vec<LegacyId>,
}

impl BatchStats {
    /// Create empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classified outcome.
    pub fn record(&mut self, status: ReconciliationStatus, confidence: f64, legacy_id: LegacyId) {
        self.total += 1;
        match status {
            ReconciliationStatus::Matched => {
                self.matched += 1;
                self.sum_matched_confidence += confidence;
            }
            ReconciliationStatus::New => self.new += 1,
            ReconciliationStatus::Conflict => self.conflict += 1,
            ReconciliationStatus::Ambiguous => {
                self.ambiguous += 1;
                self.ambiguous_legacy_ids.push(legacy_id);
            }
            ReconciliationStatus::Error => self.error += 1,
        }
    }

    /// Average confidence over matched records, 0.0 when none matched.
    #[must_use]
    pub fn average_matched_confidence(&self) -> f64 {
        if self.matched == 0 {
            0.0
        } else {
            self.sum_matched_confidence / f64::from(self.matched)
        }
    }
}

/// Per-entity summary inside a run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySummary {
    /// Batch counters.
    pub stats: BatchStats,
    /// Wall-clock time spent on this entity type.
    pub elapsed: Duration,
    /// Whether staging writes were skipped.
    pub dry_run: bool,
}

/// Aggregated statistics for one full pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Summaries keyed by entity type, in processed order.
    pub entities: BTreeMap<EntityType, EntitySummary>,
    /// Total wall-clock time for the run.
    pub elapsed: Duration,
    /// Staging write counters merged across entity types. All zero on a
    /// dry run.
    pub writes: WriteStats,
    /// Whether the run stopped early on an abort request.
    pub aborted: bool,
}

impl RunStats {
    /// Record one entity batch.
    pub fn record_entity(&mut self, entity: EntityType, summary: EntitySummary) {
        self.entities.insert(entity, summary);
    }

    /// Total records processed across entity types.
    #[must_use]
    pub fn total_records(&self) -> u32 {
        self.entities.values().map(|s| s.stats.total).sum()
    }

    /// Total error-classified records, reported distinctly from
    /// ambiguous/conflict so operators can tell data-quality issues
    /// from system failures.
    #[must_use]
    pub fn total_errors(&self) -> u32 {
        self.entities.values().map(|s| s.stats.error).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn average_confidence_over_matched_only() {
        let mut stats = BatchStats::new();
        stats.record(ReconciliationStatus::Matched, 1.0, LegacyId::new(1));
        stats.record(ReconciliationStatus::Matched, 0.65, LegacyId::new(2));
        stats.record(ReconciliationStatus::New, 0.0, LegacyId::new(3));
        assert_eq!(stats.average_matched_confidence(), 0.825);
        assert_eq!(stats.total, 3);
    }

    #[test]
    fn no_matches_means_zero_average() {
        let stats = BatchStats::new();
        assert_eq!(stats.average_matched_confidence(), 0.0);
    }

    #[test]
    fn ambiguous_ids_are_collected() {
        let mut stats = BatchStats::new();
        stats.record(ReconciliationStatus::Ambiguous, 0.0, LegacyId::new(42));
        assert_eq!(stats.ambiguous_legacy_ids, vec![LegacyId::new(42)]);
        assert_eq!(stats.ambiguous, 1);
    }

    #[test]
    fn run_totals_sum_entities() {
        let mut run = RunStats::default();
        let mut a = BatchStats::new();
        a.record(ReconciliationStatus::Error, 0.0, LegacyId::new(1));
        run.record_entity(
            EntityType::Organization,
            EntitySummary {
                stats: a,
                elapsed: Duration::from_millis(5),
                dry_run: false,
            },
        );
        assert_eq!(run.total_records(), 1);
        assert_eq!(run.total_errors(), 1);
    }
}
