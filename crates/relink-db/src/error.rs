//! Error types for the relink-db crate.

use relink_core::ReconcileError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// Staging schema bootstrap failed.
    #[error("Schema setup failed: {0}")]
    SchemaFailed(#[source] sqlx::Error),

    /// A query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl DbError {
    /// Whether the underlying failure is worth a bounded retry
    /// (dropped connection, pool timeout, serialization conflict).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        let source = match self {
            DbError::ConnectionFailed(e) | DbError::SchemaFailed(e) | DbError::QueryFailed(e) => e,
            DbError::Configuration(_) => return false,
        };
        match source {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Database(db) => {
                // class 40: transaction rollback (serialization failure, deadlock)
                db.code().is_some_and(|code| code.starts_with("40"))
            }
            _ => false,
        }
    }
}

impl From<DbError> for ReconcileError {
    fn from(err: DbError) -> Self {
        ReconcileError::Connectivity {
            context: "staging database".to_string(),
            message: err.to_string(),
        }
    }
}
