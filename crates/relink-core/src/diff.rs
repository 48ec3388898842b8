//! Field-level diff between a legacy record and its matched target.
//!
//! For every comparable field: a non-null legacy value that differs from
//! the target value becomes a property to update. If the target system
//! is system-of-record for the field (policy `authoritative`) and both
//! sides are non-null, the difference is recorded as a conflict instead;
//! only conflicts on `blocking` fields downgrade the match status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Per-entity conflict policy.
///
/// The blocking-field set is operator configuration: by default nothing
/// is authoritative or blocking, so differences are staged as updates
/// and conflicts are log-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffPolicy {
    /// Fields for which the target system is system-of-record. A
    /// difference on such a field (both sides non-null) is a conflict,
    /// not an update.
    #[serde(default)]
    pub authoritative: BTreeSet<String>,
    /// Conflicting fields that downgrade the record status to conflict.
    /// Must be a subset of `authoritative` to have any effect.
    #[serde(default)]
    pub blocking: BTreeSet<String>,
    /// Fields whose diff comparison ignores ASCII case. Matching keys
    /// are always case-insensitive; this controls only the diff.
    #[serde(default)]
    pub case_insensitive: BTreeSet<String>,
}

impl DiffPolicy {
    /// Mark fields as authoritative on the target side.
    #[must_use]
    pub fn with_authoritative<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authoritative.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Mark fields as blocking (implies authoritative).
    #[must_use]
    pub fn with_blocking<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            let field = field.into();
            self.authoritative.insert(field.clone());
            self.blocking.insert(field);
        }
        self
    }

    /// Mark fields whose diff comparison is case-insensitive.
    #[must_use]
    pub fn with_case_insensitive<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.case_insensitive
            .extend(fields.into_iter().map(Into::into));
        self
    }
}

/// Outcome of diffing one legacy record against one target record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDiff {
    /// Fields whose legacy value should be written to the target,
    /// keyed by target property name.
    pub properties_to_update: Map<String, Value>,
    /// Fields where both sides are non-null and irreconcilably differ.
    pub conflicts: Vec<String>,
    /// Whether any conflict field is marked blocking in the policy.
    pub has_blocking_conflict: bool,
}

impl FieldDiff {
    /// Whether the diff found nothing to update or flag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties_to_update.is_empty() && self.conflicts.is_empty()
    }
}

/// Accumulates one field comparison at a time into a [`FieldDiff`].
///
/// Entity `diff()` implementations list their comparable fields
/// explicitly through the typed methods here, so the comparable-field
/// set is checked at compile time.
pub struct DiffBuilder<'a> {
    policy: &'a DiffPolicy,
    diff: FieldDiff,
}

impl<'a> DiffBuilder<'a> {
    /// Start a diff under the given policy.
    #[must_use]
    pub fn new(policy: &'a DiffPolicy) -> Self {
        Self {
            policy,
            diff: FieldDiff::default(),
        }
    }

    /// Compare a text field.
    pub fn text(&mut self, field: &str, legacy: Option<&str>, target: Option<&str>) -> &mut Self {
        let legacy = legacy.map(str::trim).filter(|s| !s.is_empty());
        let target = target.map(str::trim).filter(|s| !s.is_empty());
        let equal = match (legacy, target) {
            (Some(l), Some(t)) => {
                if self.policy.case_insensitive.contains(field) {
                    l.eq_ignore_ascii_case(t)
                } else {
                    l == t
                }
            }
            _ => false,
        };
        self.record(field, legacy.map(|l| Value::String(l.to_string())), target.is_some(), equal)
    }

    /// Compare an integer field.
    pub fn integer(&mut self, field: &str, legacy: Option<i64>, target: Option<i64>) -> &mut Self {
        let equal = matches!((legacy, target), (Some(l), Some(t)) if l == t);
        self.record(field, legacy.map(Value::from), target.is_some(), equal)
    }

    /// Compare a decimal field (amounts).
    pub fn decimal(
        &mut self,
        field: &str,
        legacy: Option<Decimal>,
        target: Option<Decimal>,
    ) -> &mut Self {
        let equal = matches!((legacy, target), (Some(l), Some(t)) if l == t);
        self.record(
            field,
            legacy.map(|l| Value::String(l.to_string())),
            target.is_some(),
            equal,
        )
    }

    /// Compare a timestamp field.
    pub fn timestamp(
        &mut self,
        field: &str,
        legacy: Option<DateTime<Utc>>,
        target: Option<DateTime<Utc>>,
    ) -> &mut Self {
        let equal = matches!((legacy, target), (Some(l), Some(t)) if l == t);
        self.record(
            field,
            legacy.map(|l| Value::String(l.to_rfc3339())),
            target.is_some(),
            equal,
        )
    }

    /// Finish and return the accumulated diff.
    #[must_use]
    pub fn finish(&mut self) -> FieldDiff {
        std::mem::take(&mut self.diff)
    }

    /// Core rule shared by all typed comparisons.
    ///
    /// `legacy_value` is `None` when the legacy side is null (null legacy
    /// values never produce updates or conflicts).
    fn record(
        &mut self,
        field: &str,
        legacy_value: Option<Value>,
        target_present: bool,
        equal: bool,
    ) -> &mut Self {
        let Some(legacy_value) = legacy_value else {
            return self;
        };
        if equal {
            return self;
        }
        if target_present && self.policy.authoritative.contains(field) {
            self.diff.conflicts.push(field.to_string());
            if self.policy.blocking.contains(field) {
                self.diff.has_blocking_conflict = true;
            }
        } else {
            self.diff
                .properties_to_update
                .insert(field.to_string(), legacy_value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn legacy_null_is_ignored() {
        let policy = DiffPolicy::default();
        let diff = DiffBuilder::new(&policy)
            .text("name", None, Some("Acme"))
            .finish();
        assert!(diff.is_empty());
    }

    #[test]
    fn difference_becomes_update() {
        let policy = DiffPolicy::default();
        let diff = DiffBuilder::new(&policy)
            .text("name", Some("Acme Corp"), Some("ACME CORP"))
            .finish();
        assert_eq!(diff.properties_to_update["name"], "Acme Corp");
        assert!(diff.conflicts.is_empty());
    }

    #[test]
    fn case_insensitive_fields_compare_equal() {
        let policy = DiffPolicy::default().with_case_insensitive(["name"]);
        let diff = DiffBuilder::new(&policy)
            .text("name", Some("Acme Corp"), Some("ACME CORP"))
            .finish();
        assert!(diff.is_empty());
    }

    #[test]
    fn target_missing_value_is_backfilled_even_when_authoritative() {
        let policy = DiffPolicy::default().with_authoritative(["industry"]);
        let diff = DiffBuilder::new(&policy)
            .text("industry", Some("Semiconductors"), None)
            .finish();
        assert_eq!(diff.properties_to_update["industry"], "Semiconductors");
    }

    #[test]
    fn authoritative_difference_is_conflict_not_update() {
        let policy = DiffPolicy::default().with_authoritative(["stage"]);
        let diff = DiffBuilder::new(&policy)
            .text("stage", Some("negotiation"), Some("closedwon"))
            .finish();
        assert_eq!(diff.conflicts, vec!["stage".to_string()]);
        assert!(!diff.has_blocking_conflict);
        assert!(!diff.properties_to_update.contains_key("stage"));
    }

    #[test]
    fn blocking_conflict_is_flagged() {
        let policy = DiffPolicy::default().with_blocking(["amount"]);
        let diff = DiffBuilder::new(&policy)
            .decimal(
                "amount",
                Some(Decimal::new(10_000, 2)),
                Some(Decimal::new(25_000, 2)),
            )
            .finish();
        assert_eq!(diff.conflicts, vec!["amount".to_string()]);
        assert!(diff.has_blocking_conflict);
    }

    #[test]
    fn whitespace_only_text_is_null() {
        let policy = DiffPolicy::default();
        let diff = DiffBuilder::new(&policy)
            .text("city", Some("   "), Some("Geneva"))
            .finish();
        assert!(diff.is_empty());
    }
}
