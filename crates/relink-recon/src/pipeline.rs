//! Pipeline coordination across entity types.
//!
//! Entity types are reconciled strictly sequentially in dependency
//! order, because a child's foreign-key resolution consults the
//! already-staged parent mapping. Out-of-order type lists are rejected
//! when the coordinator is constructed, not silently reordered.
//!
//! Failure semantics: a record-scoped failure is classified and staged
//! as an error row; connectivity failures from any seam abort the run.
//! A run may be aborted between entity types: staged rows for completed
//! types remain valid since each type's reconciliation is independently
//! idempotent.

use crate::index::CandidateIndex;
use crate::matcher::{MatchResult, MatcherConfig};
use crate::reconciler::{reconcile_batch, ReconcileOptions, SourceRecord};
use crate::stats::{EntitySummary, RunStats};
use async_trait::async_trait;
use relink_core::{
    DiffPolicy, EntityType, LegacyCommunication, LegacyDeal, LegacyEntity, LegacyOrganization,
    LegacyPerson, LegacySupportCase, ParentLinks, ReconcileResult, RunId, TargetCommunication,
    TargetDeal, TargetOrganization, TargetPerson, TargetSupportCase,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Produces legacy records per entity type (Bronze layer).
///
/// Implementations must guarantee legacy-id uniqueness within a type.
#[async_trait]
pub trait LegacySource: Send + Sync {
    async fn organizations(&self) -> ReconcileResult<Vec<SourceRecord<LegacyOrganization>>>;
    async fn people(&self) -> ReconcileResult<Vec<SourceRecord<LegacyPerson>>>;
    async fn deals(&self) -> ReconcileResult<Vec<SourceRecord<LegacyDeal>>>;
    async fn support_cases(&self) -> ReconcileResult<Vec<SourceRecord<LegacySupportCase>>>;
    async fn communications(&self) -> ReconcileResult<Vec<SourceRecord<LegacyCommunication>>>;
}

/// Reads target-system record snapshots per entity type.
#[async_trait]
pub trait TargetMirror: Send + Sync {
    async fn organizations(&self) -> ReconcileResult<Vec<TargetOrganization>>;
    async fn people(&self) -> ReconcileResult<Vec<TargetPerson>>;
    async fn deals(&self) -> ReconcileResult<Vec<TargetDeal>>;
    async fn support_cases(&self) -> ReconcileResult<Vec<TargetSupportCase>>;
    async fn communications(&self) -> ReconcileResult<Vec<TargetCommunication>>;
}

/// Persists reconciliation outcomes. Exclusively owns staged state; the
/// reconciler never mutates persisted rows directly.
#[async_trait]
pub trait StagingSink: Send + Sync {
    /// Upsert a batch of outcomes, keyed on (entity type, legacy id).
    async fn upsert(
        &self,
        entity: EntityType,
        run_id: RunId,
        results: &[MatchResult],
    ) -> ReconcileResult<WriteStats>;

    /// Staged legacy→target links for an entity type (matched rows).
    async fn parent_links(&self, entity: EntityType) -> ReconcileResult<ParentLinks>;
}

/// Counters returned by a staging upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteStats {
    /// Rows inserted for the first time.
    pub inserted: u32,
    /// Rows overwritten in place.
    pub updated: u32,
    /// Rows that failed non-transiently and were left untouched.
    pub failed: u32,
}

impl WriteStats {
    /// Merge another write's counters into this one.
    pub fn merge(&mut self, other: WriteStats) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

/// Coordinator configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// A child entity type is listed before a parent it depends on.
    #[error("{child} depends on {parent}, which must be reconciled earlier in the run")]
    OrderViolation {
        child: EntityType,
        parent: EntityType,
    },

    /// The same entity type is listed twice.
    #[error("Entity type {0} listed more than once")]
    Duplicate(EntityType),

    /// Nothing to do.
    #[error("Empty entity type list")]
    Empty,
}

/// Per-run options applied to every entity batch.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Cap on legacy records per entity type (staged rollout).
    pub limit: Option<usize>,
    /// Compute and report, but skip staging writes.
    pub dry_run: bool,
    /// Confidence tiers.
    pub matcher: MatcherConfig,
    /// Conflict policy per entity type; unlisted types get the default
    /// (nothing authoritative, nothing blocking).
    pub policies: HashMap<EntityType, DiffPolicy>,
}

/// Cooperative abort flag checked between entity types.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Create a handle in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an abort at the next entity-type boundary.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sequences entity types and aggregates run statistics.
pub struct PipelineCoordinator<S, M, W> {
    order: Vec<EntityType>,
    source: S,
    mirror: M,
    sink: W,
    options: PipelineOptions,
    abort: AbortHandle,
}

impl<S, M, W> PipelineCoordinator<S, M, W>
where
    S: LegacySource,
    M: TargetMirror,
    W: StagingSink,
{
    /// Create a coordinator, validating the entity order up front.
    ///
    /// A parent type missing from the list is allowed (partial runs
    /// resolve links from previously staged state); a parent listed
    /// *after* its child is not.
    pub fn new(
        order: Vec<EntityType>,
        source: S,
        mirror: M,
        sink: W,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        validate_order(&order)?;
        Ok(Self {
            order,
            source,
            mirror,
            sink,
            options,
            abort: AbortHandle::new(),
        })
    }

    /// Handle for aborting the run between entity types.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run reconciliation across the configured entity types.
    pub async fn run(&self) -> ReconcileResult<RunStats> {
        let run_id = RunId::new();
        let run_started = Instant::now();
        let mut stats = RunStats::default();

        tracing::info!(
            run_id = %run_id,
            entity_types = self.order.len(),
            dry_run = self.options.dry_run,
            "Starting reconciliation run"
        );

        for &entity in &self.order {
            if self.abort.is_aborted() {
                tracing::info!(run_id = %run_id, before = %entity, "Run aborted between entity types");
                stats.aborted = true;
                break;
            }

            let started = Instant::now();
            let (batch, writes) = match entity {
                EntityType::Organization => {
                    let targets = self.mirror.organizations().await?;
                    let records = self.source.organizations().await?;
                    self.reconcile_entity(entity, records, targets, run_id).await?
                }
                EntityType::Person => {
                    let targets = self.mirror.people().await?;
                    let records = self.source.people().await?;
                    self.reconcile_entity(entity, records, targets, run_id).await?
                }
                EntityType::Deal => {
                    let targets = self.mirror.deals().await?;
                    let records = self.source.deals().await?;
                    self.reconcile_entity(entity, records, targets, run_id).await?
                }
                EntityType::SupportCase => {
                    let targets = self.mirror.support_cases().await?;
                    let records = self.source.support_cases().await?;
                    self.reconcile_entity(entity, records, targets, run_id).await?
                }
                EntityType::Communication => {
                    let targets = self.mirror.communications().await?;
                    let records = self.source.communications().await?;
                    self.reconcile_entity(entity, records, targets, run_id).await?
                }
            };

            stats.writes.merge(writes);
            stats.record_entity(
                entity,
                EntitySummary {
                    stats: batch,
                    elapsed: started.elapsed(),
                    dry_run: self.options.dry_run,
                },
            );
        }

        stats.elapsed = run_started.elapsed();
        tracing::info!(
            run_id = %run_id,
            total = stats.total_records(),
            errors = stats.total_errors(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Reconciliation run finished"
        );
        Ok(stats)
    }

    async fn reconcile_entity<L: LegacyEntity>(
        &self,
        entity: EntityType,
        records: Vec<SourceRecord<L>>,
        targets: Vec<L::Target>,
        run_id: RunId,
    ) -> ReconcileResult<(crate::stats::BatchStats, WriteStats)> {
        let mut parents = ParentLinks::new();
        for &parent in entity.parents() {
            parents.extend(self.sink.parent_links(parent).await?);
        }

        let index = CandidateIndex::build(targets);
        let options = ReconcileOptions {
            limit: self.options.limit,
            dry_run: self.options.dry_run,
            matcher: self.options.matcher.clone(),
            policy: self
                .options
                .policies
                .get(&entity)
                .cloned()
                .unwrap_or_default(),
            parents,
        };

        let (results, stats) = reconcile_batch(records, &index, &options);

        if self.options.dry_run {
            tracing::info!(entity_type = %entity, "Dry run: skipping staging writes");
            return Ok((stats, WriteStats::default()));
        }

        let writes = self.sink.upsert(entity, run_id, &results).await?;
        tracing::info!(
            entity_type = %entity,
            inserted = writes.inserted,
            updated = writes.updated,
            failed = writes.failed,
            "Staged reconciliation outcomes"
        );
        Ok((stats, writes))
    }
}

fn validate_order(order: &[EntityType]) -> Result<(), PipelineError> {
    if order.is_empty() {
        return Err(PipelineError::Empty);
    }
    for (pos, &entity) in order.iter().enumerate() {
        if order[..pos].contains(&entity) {
            return Err(PipelineError::Duplicate(entity));
        }
        for &parent in entity.parents() {
            if let Some(parent_pos) = order.iter().position(|&e| e == parent) {
                if parent_pos > pos {
                    return Err(PipelineError::OrderViolation {
                        child: entity,
                        parent,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relink_core::{
        LegacyId, MatchBasis, ReconcileError, ReconciliationStatus, TargetId,
    };
    use std::sync::Mutex;

    #[test]
    fn canonical_order_is_valid() {
        assert_eq!(validate_order(&EntityType::ALL), Ok(()));
    }

    #[test]
    fn child_before_parent_is_rejected() {
        let err = validate_order(&[EntityType::Deal, EntityType::Organization]).unwrap_err();
        assert_eq!(
            err,
            PipelineError::OrderViolation {
                child: EntityType::Deal,
                parent: EntityType::Organization,
            }
        );
    }

    #[test]
    fn missing_parent_is_allowed() {
        // partial run: links come from previously staged state
        assert_eq!(validate_order(&[EntityType::Deal]), Ok(()));
    }

    #[test]
    fn duplicates_are_rejected() {
        let err =
            validate_order(&[EntityType::Organization, EntityType::Organization]).unwrap_err();
        assert_eq!(err, PipelineError::Duplicate(EntityType::Organization));
    }

    #[test]
    fn empty_list_is_rejected() {
        assert_eq!(validate_order(&[]), Err(PipelineError::Empty));
    }

    // -- coordinator behaviour over in-memory fakes --------------------

    #[derive(Default)]
    struct FakeSource {
        organizations: Vec<SourceRecord<LegacyOrganization>>,
        people: Vec<SourceRecord<LegacyPerson>>,
    }

    #[async_trait]
    impl LegacySource for FakeSource {
        async fn organizations(&self) -> ReconcileResult<Vec<SourceRecord<LegacyOrganization>>> {
            Ok(self.organizations.iter().map(clone_source).collect())
        }
        async fn people(&self) -> ReconcileResult<Vec<SourceRecord<LegacyPerson>>> {
            Ok(self.people.iter().map(clone_source).collect())
        }
        async fn deals(&self) -> ReconcileResult<Vec<SourceRecord<LegacyDeal>>> {
            Ok(Vec::new())
        }
        async fn support_cases(&self) -> ReconcileResult<Vec<SourceRecord<LegacySupportCase>>> {
            Ok(Vec::new())
        }
        async fn communications(&self) -> ReconcileResult<Vec<SourceRecord<LegacyCommunication>>> {
            Ok(Vec::new())
        }
    }

    fn clone_source<L: Clone>(record: &SourceRecord<L>) -> SourceRecord<L> {
        match record {
            Ok(r) => Ok(r.clone()),
            Err(e) => Err(e.clone()),
        }
    }

    #[derive(Default)]
    struct FakeMirror {
        organizations: Vec<TargetOrganization>,
        people: Vec<TargetPerson>,
        fail_people: bool,
    }

    #[async_trait]
    impl TargetMirror for FakeMirror {
        async fn organizations(&self) -> ReconcileResult<Vec<TargetOrganization>> {
            Ok(self.organizations.clone())
        }
        async fn people(&self) -> ReconcileResult<Vec<TargetPerson>> {
            if self.fail_people {
                return Err(ReconcileError::Connectivity {
                    context: "target mirror".into(),
                    message: "connection reset".into(),
                });
            }
            Ok(self.people.clone())
        }
        async fn deals(&self) -> ReconcileResult<Vec<TargetDeal>> {
            Ok(Vec::new())
        }
        async fn support_cases(&self) -> ReconcileResult<Vec<TargetSupportCase>> {
            Ok(Vec::new())
        }
        async fn communications(&self) -> ReconcileResult<Vec<TargetCommunication>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        staged: Mutex<Vec<(EntityType, MatchResult)>>,
    }

    #[async_trait]
    impl StagingSink for FakeSink {
        async fn upsert(
            &self,
            entity: EntityType,
            _run_id: RunId,
            results: &[MatchResult],
        ) -> ReconcileResult<WriteStats> {
            let mut staged = self.staged.lock().unwrap();
            for result in results {
                staged.push((entity, result.clone()));
            }
            Ok(WriteStats {
                inserted: results.len() as u32,
                updated: 0,
                failed: 0,
            })
        }

        async fn parent_links(&self, entity: EntityType) -> ReconcileResult<ParentLinks> {
            let mut links = ParentLinks::new();
            for (staged_entity, result) in self.staged.lock().unwrap().iter() {
                if *staged_entity == entity && result.status.is_linked() {
                    if let Some(target_id) = result.target_id {
                        links.insert(entity, result.legacy_id, target_id);
                    }
                }
            }
            Ok(links)
        }
    }

    fn org(legacy_id: i64, name: &str) -> LegacyOrganization {
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

    fn target_org(target_id: i64, legacy_tag: Option<i64>, name: &str) -> TargetOrganization {
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

    #[tokio::test]
    async fn run_stages_parent_links_for_children() {
        let source = FakeSource {
            organizations: vec![Ok(org(101, "Acme"))],
            people: vec![Ok(LegacyPerson {
                legacy_id: LegacyId::new(200),
                first_name: Some("Ada".into()),
                last_name: "Marechal".into(),
                email: Some("ada@acme.com".into()),
                phone: None,
                mobile: None,
                job_title: None,
                organization_id: Some(LegacyId::new(101)),
            })],
        };
        let mirror = FakeMirror {
            organizations: vec![target_org(900, Some(101), "Acme")],
            people: vec![TargetPerson {
                target_id: TargetId::new(70),
                legacy_tag: None,
                first_name: Some("Ada".into()),
                last_name: Some("Marechal".into()),
                email: Some("ada@acme.com".into()),
                phone: None,
                job_title: None,
                organization_id: None,
            }],
            fail_people: false,
        };

        let coordinator = PipelineCoordinator::new(
            vec![EntityType::Organization, EntityType::Person],
            source,
            mirror,
            FakeSink::default(),
            PipelineOptions::default(),
        )
        .unwrap();

        let stats = coordinator.run().await.unwrap();
        assert_eq!(stats.entities.len(), 2);
        assert!(!stats.aborted);
        // one org row plus one person row, merged across the two batches
        assert_eq!(stats.writes.inserted, 2);
        assert_eq!(stats.writes.failed, 0);

        let staged = coordinator.sink.staged.lock().unwrap();
        let person = staged
            .iter()
            .find(|(e, _)| *e == EntityType::Person)
            .map(|(_, r)| r)
            .unwrap();
        assert_eq!(person.status, ReconciliationStatus::Matched);
        assert_eq!(person.basis, MatchBasis::ExactContact);
        // the person's organization FK resolved through the staged org link
        assert_eq!(
            person.properties_to_update["associated_organization_id"],
            900
        );
    }

    #[tokio::test]
    async fn connectivity_failure_aborts_the_run() {
        let coordinator = PipelineCoordinator::new(
            vec![EntityType::Organization, EntityType::Person],
            FakeSource::default(),
            FakeMirror {
                fail_people: true,
                ..Default::default()
            },
            FakeSink::default(),
            PipelineOptions::default(),
        )
        .unwrap();

        let err = coordinator.run().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn dry_run_stages_nothing() {
        let coordinator = PipelineCoordinator::new(
            vec![EntityType::Organization],
            FakeSource {
                organizations: vec![Ok(org(101, "Acme"))],
                ..Default::default()
            },
            FakeMirror::default(),
            FakeSink::default(),
            PipelineOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .unwrap();

        let stats = coordinator.run().await.unwrap();
        assert_eq!(stats.entities[&EntityType::Organization].stats.new, 1);
        assert_eq!(stats.writes, WriteStats::default());
        assert!(coordinator.sink.staged.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn abort_stops_before_next_entity_type() {
        let coordinator = PipelineCoordinator::new(
            vec![EntityType::Organization],
            FakeSource::default(),
            FakeMirror::default(),
            FakeSink::default(),
            PipelineOptions::default(),
        )
        .unwrap();
        coordinator.abort_handle().abort();
        let stats = coordinator.run().await.unwrap();
        assert!(stats.aborted);
        assert!(stats.entities.is_empty());
    }

    #[test]
    fn construction_rejects_bad_order() {
        let result = PipelineCoordinator::new(
            vec![EntityType::Communication, EntityType::Organization],
            FakeSource::default(),
            FakeMirror::default(),
            FakeSink::default(),
            PipelineOptions::default(),
        );
        assert!(matches!(
            result.err().unwrap(),
            PipelineError::OrderViolation { .. }
        ));
    }
}
