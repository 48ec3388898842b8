//! Candidate index over target-system records.
//!
//! Built once per entity type per run from the full mirror snapshot,
//! then frozen: construction is single-threaded, lookups are shared
//! reads. Three structures back the match cascade:
//!
//! - `by_legacy_tag`: exact, authoritative once populated
//! - `by_contact_key`: normalized email/phone fallback
//! - `by_name_key`: normalized name fallback
//!
//! Empty keys are never indexed; an empty normalized name must not
//! match another empty normalized name.

use relink_core::{LegacyId, MatchBasis, TargetEntity, TargetId};
use std::collections::HashMap;

/// Lookup structures over one entity type's target records.
pub struct CandidateIndex<T> {
    records: Vec<T>,
    by_legacy_tag: HashMap<LegacyId, usize>,
    by_contact_key: HashMap<String, Vec<usize>>,
    by_name_key: HashMap<String, Vec<usize>>,
}

impl<T: TargetEntity> CandidateIndex<T> {
    /// Build the index from a mirror snapshot.
    ///
    /// A duplicate legacy tag across target records is a data-integrity
    /// warning, not a fatal error: the first-seen record keeps the tag
    /// slot and duplicates are logged.
    #[must_use]
    pub fn build(records: Vec<T>) -> Self {
        let mut by_legacy_tag = HashMap::new();
        let mut by_contact_key: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_name_key: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, record) in records.iter().enumerate() {
            if let Some(tag) = record.legacy_tag() {
                if let Some(&first) = by_legacy_tag.get(&tag) {
                    let first: &T = &records[first];
                    tracing::warn!(
                        legacy_tag = %tag,
                        kept = %first.target_id(),
                        duplicate = %record.target_id(),
                        "Duplicate legacy tag on target records; first-seen wins"
                    );
                } else {
                    by_legacy_tag.insert(tag, pos);
                }
            }
            if let Some(key) = record.contact_key() {
                by_contact_key.entry(key).or_default().push(pos);
            }
            if let Some(key) = record.name_key() {
                by_name_key.entry(key).or_default().push(pos);
            }
        }

        Self {
            records,
            by_legacy_tag,
            by_contact_key,
            by_name_key,
        }
    }

    /// Exact lookup by the target-side stored legacy tag.
    #[must_use]
    pub fn by_legacy_tag(&self, legacy_id: LegacyId) -> Option<&T> {
        self.by_legacy_tag.get(&legacy_id).map(|&pos| &self.records[pos])
    }

    /// Records whose normalized contact matches the key.
    pub fn by_contact_key(&self, key: &str) -> impl Iterator<Item = &T> {
        self.by_contact_key
            .get(key)
            .into_iter()
            .flatten()
            .map(|&pos| &self.records[pos])
    }

    /// Records whose normalized name matches the key.
    pub fn by_name_key(&self, key: &str) -> impl Iterator<Item = &T> {
        self.by_name_key
            .get(key)
            .into_iter()
            .flatten()
            .map(|&pos| &self.records[pos])
    }

    /// All candidates for the given keys in basis-priority order
    /// (legacy tag, then contact, then name), deduplicated by target id.
    ///
    /// Used when gathering every plausible candidate for ambiguity
    /// detection; the cascade's short-circuit path uses the individual
    /// lookups instead.
    #[must_use]
    pub fn lookup(
        &self,
        legacy_id: LegacyId,
        contact_key: Option<&str>,
        name_key: Option<&str>,
    ) -> Vec<(&T, MatchBasis)> {
        let mut seen: Vec<TargetId> = Vec::new();
        let mut out: Vec<(&T, MatchBasis)> = Vec::new();

        let tagged = self.by_legacy_tag(legacy_id).into_iter();
        let by_contact = contact_key
            .into_iter()
            .flat_map(|key| self.by_contact_key(key));
        let by_name = name_key.into_iter().flat_map(|key| self.by_name_key(key));

        let ordered = tagged
            .map(|r| (r, MatchBasis::ExactLegacyTag))
            .chain(by_contact.map(|r| (r, MatchBasis::ExactContact)))
            .chain(by_name.map(|r| (r, MatchBasis::NormalizedName)));

        for (record, basis) in ordered {
            if !seen.contains(&record.target_id()) {
                seen.push(record.target_id());
                out.push((record, basis));
            }
        }
        out
    }

    /// Number of indexed target records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the snapshot was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use relink_core::TargetOrganization;

    fn org(
        target_id: i64,
        legacy_tag: Option<i64>,
        name: &str,
        phone: Option<&str>,
    ) -> TargetOrganization {
        TargetOrganization {
            target_id: TargetId::new(target_id),
            legacy_tag: legacy_tag.map(LegacyId::new),
            name: Some(name.to_string()),
            domain: None,
            phone: phone.map(str::to_string),
            industry: None,
            employees: None,
            city: None,
            country: None,
        }
    }

    #[test]
    fn tag_lookup_is_exact() {
        let index = CandidateIndex::build(vec![org(9, Some(101), "Acme", None)]);
        assert_eq!(
            index.by_legacy_tag(LegacyId::new(101)).unwrap().target_id,
            TargetId::new(9)
        );
        assert!(index.by_legacy_tag(LegacyId::new(102)).is_none());
    }

    #[test]
    fn duplicate_tags_first_seen_wins() {
        let index = CandidateIndex::build(vec![
            org(1, Some(55), "Old Name", None),
            org(2, Some(55), "New Name", None),
        ]);
        assert_eq!(
            index.by_legacy_tag(LegacyId::new(55)).unwrap().target_id,
            TargetId::new(1)
        );
    }

    #[test]
    fn name_keys_are_normalized() {
        let index = CandidateIndex::build(vec![org(9, None, "Acme Corporation", None)]);
        let hits: Vec<_> = index.by_name_key("acme").collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn empty_names_are_not_indexed() {
        let mut record = org(9, None, "", None);
        record.name = Some("   ".into());
        let index = CandidateIndex::build(vec![record]);
        assert!(index.by_name_key("").next().is_none());
    }

    #[test]
    fn lookup_orders_by_basis_priority() {
        let index = CandidateIndex::build(vec![
            org(1, Some(7), "Globex", None),
            org(2, None, "Initech", Some("+41 22 555 01 02")),
            org(3, None, "Acme", None),
        ]);
        let hits = index.lookup(LegacyId::new(7), Some("41225550102"), Some("acme"));
        let bases: Vec<_> = hits.iter().map(|(_, b)| *b).collect();
        assert_eq!(
            bases,
            vec![
                MatchBasis::ExactLegacyTag,
                MatchBasis::ExactContact,
                MatchBasis::NormalizedName
            ]
        );
    }

    #[test]
    fn lookup_deduplicates_across_bases() {
        let index = CandidateIndex::build(vec![org(2, None, "Acme", Some("+41 22 555 01 02"))]);
        let hits = index.lookup(LegacyId::new(1), Some("41225550102"), Some("acme"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1, MatchBasis::ExactContact);
    }
}
