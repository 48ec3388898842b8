//! Strongly Typed Identifiers
//!
//! Newtype identifiers for the two record id spaces and for
//! reconciliation runs. Legacy and target ids are both integers in the
//! underlying stores, so the newtypes exist to make it impossible to
//! hand a cloud record id to an API expecting a legacy one.
//!
//! # Example
//!
//! ```
//! use relink_core::{LegacyId, TargetId};
//!
//! fn requires_legacy(id: LegacyId) -> i64 {
//!     id.as_i64()
//! }
//!
//! let legacy = LegacyId::new(101);
//! let target = TargetId::new(9);
//! requires_legacy(legacy);
//! // requires_legacy(target); // does not compile
//! # let _ = target;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Macro to define a strongly-typed integer record id.
macro_rules! define_record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an id from its raw integer value.
            #[must_use]
            pub fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw integer value.
            #[must_use]
            pub fn as_i64(self) -> i64 {
                self.0
            }

            /// Whether this id is usable as a primary key.
            ///
            /// Source extracts occasionally carry zero or negative
            /// placeholders for missing keys; those never identify a record.
            #[must_use]
            pub fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_record_id!(
    /// Entity-type-scoped primary key from the legacy system.
    LegacyId
);

define_record_id!(
    /// Record id in the target (cloud CRM) system.
    TargetId
);

/// Identifier of one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a run id from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_id_roundtrip() {
        let id = LegacyId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(LegacyId::from(42), id);
    }

    #[test]
    fn invalid_ids() {
        assert!(!LegacyId::new(0).is_valid());
        assert!(!LegacyId::new(-7).is_valid());
        assert!(TargetId::new(1).is_valid());
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn run_id_uuid_roundtrip() {
        let id = RunId::new();
        assert_eq!(RunId::from_uuid(*id.as_uuid()), id);
    }

    #[test]
    fn serde_transparent() {
        let id = TargetId::new(9);
        assert_eq!(serde_json::to_string(&id).unwrap(), "9");
        let back: TargetId = serde_json::from_str("9").unwrap();
        assert_eq!(back, id);
    }
}
