//! Reconciliation outcome classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of one legacy record after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    /// A single target record was identified for the legacy record.
    Matched,
    /// No target record corresponds to the legacy record yet.
    New,
    /// Matched, but a blocking field disagrees with the target
    /// system-of-record value.
    Conflict,
    /// More than one equally plausible target candidate; left for
    /// manual review, never auto-resolved.
    Ambiguous,
    /// The record could not be processed (missing id, unparsable value,
    /// or a non-transient staging write failure).
    Error,
}

impl ReconciliationStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Matched => "matched",
            ReconciliationStatus::New => "new",
            ReconciliationStatus::Conflict => "conflict",
            ReconciliationStatus::Ambiguous => "ambiguous",
            ReconciliationStatus::Error => "error",
        }
    }

    /// Whether a staged row with this status carries a usable target id.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        matches!(
            self,
            ReconciliationStatus::Matched | ReconciliationStatus::Conflict
        )
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReconciliationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "matched" => Ok(ReconciliationStatus::Matched),
            "new" => Ok(ReconciliationStatus::New),
            "conflict" => Ok(ReconciliationStatus::Conflict),
            "ambiguous" => Ok(ReconciliationStatus::Ambiguous),
            "error" => Ok(ReconciliationStatus::Error),
            _ => Err(format!("Unknown reconciliation status: {s}")),
        }
    }
}

/// The rule tier that produced a match.
///
/// Ordering is significant: the explicit legacy-id tag set by a prior
/// successful sync always wins over content heuristics, which keeps
/// matches stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    /// The target record's stored legacy tag equals the legacy id.
    ExactLegacyTag,
    /// Normalized email or phone matched exactly.
    ExactContact,
    /// Normalized (suffix-stripped, case-folded) name matched.
    NormalizedName,
    /// No basis: the record is new, ambiguous, or errored.
    None,
}

impl MatchBasis {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchBasis::ExactLegacyTag => "exact_legacy_tag",
            MatchBasis::ExactContact => "exact_contact",
            MatchBasis::NormalizedName => "normalized_name",
            MatchBasis::None => "none",
        }
    }
}

impl fmt::Display for MatchBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MatchBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact_legacy_tag" => Ok(MatchBasis::ExactLegacyTag),
            "exact_contact" => Ok(MatchBasis::ExactContact),
            "normalized_name" => Ok(MatchBasis::NormalizedName),
            "none" => Ok(MatchBasis::None),
            _ => Err(format!("Unknown match basis: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            ReconciliationStatus::Matched,
            ReconciliationStatus::New,
            ReconciliationStatus::Conflict,
            ReconciliationStatus::Ambiguous,
            ReconciliationStatus::Error,
        ] {
            assert_eq!(
                status.as_str().parse::<ReconciliationStatus>().unwrap(),
                status
            );
        }
    }

    #[test]
    fn linked_statuses() {
        assert!(ReconciliationStatus::Matched.is_linked());
        assert!(ReconciliationStatus::Conflict.is_linked());
        assert!(!ReconciliationStatus::New.is_linked());
        assert!(!ReconciliationStatus::Ambiguous.is_linked());
        assert!(!ReconciliationStatus::Error.is_linked());
    }

    #[test]
    fn basis_roundtrip() {
        for basis in [
            MatchBasis::ExactLegacyTag,
            MatchBasis::ExactContact,
            MatchBasis::NormalizedName,
            MatchBasis::None,
        ] {
            assert_eq!(basis.as_str().parse::<MatchBasis>().unwrap(), basis);
        }
    }
}
