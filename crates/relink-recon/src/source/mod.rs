//! Legacy record sources.
//!
//! The production source is a directory of Bronze-layer CSV snapshots
//! ([`csv::CsvBronzeSource`]); the [`crate::pipeline::LegacySource`]
//! seam keeps the engine independent of where batches come from.
//!
//! Failure semantics mirror the rest of the engine: an unreadable
//! snapshot file escalates as a connectivity failure, while a single
//! unparsable row is delivered as a malformed record and reconciled
//! into an `error` classification.

pub mod csv;

use relink_core::{EntityType, ReconcileError};
use std::path::PathBuf;
use thiserror::Error;

/// Failures reading a snapshot file as a whole.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The snapshot file is missing or unreadable.
    #[error("Cannot read {entity_type} snapshot at {path}: {source}")]
    Io {
        entity_type: EntityType,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file is not parsable CSV at all (bad header, wrong
    /// delimiter). Row-level parse failures are not a `SourceError`.
    #[error("Invalid {entity_type} snapshot at {path}: {message}")]
    Format {
        entity_type: EntityType,
        path: PathBuf,
        message: String,
    },
}

impl From<SourceError> for ReconcileError {
    fn from(err: SourceError) -> Self {
        let context = match &err {
            SourceError::Io { entity_type, path, .. }
            | SourceError::Format { entity_type, path, .. } => {
                format!("{entity_type} snapshot {}", path.display())
            }
        };
        ReconcileError::Connectivity {
            context,
            message: err.to_string(),
        }
    }
}
