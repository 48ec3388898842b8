//! Database configuration.

use crate::error::DbError;

/// Connection and schema settings for the staging store.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Postgres connection URL.
    pub database_url: String,

    /// Maximum pool size.
    pub max_connections: u32,

    /// Seconds to wait when acquiring a connection from the pool.
    pub acquire_timeout_secs: u64,

    /// Bounded reconnection attempts at startup before giving up.
    pub connect_attempts: u32,

    /// Schema holding the reconciliation staging tables.
    pub staging_schema: String,

    /// Schema holding the mirrored target-system tables.
    pub mirror_schema: String,
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, DbError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Lets tests supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, DbError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let database_url = reader("DATABASE_URL")
            .map_err(|_| DbError::Configuration("DATABASE_URL is not set".into()))?;

        let max_connections = reader("RELINK_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|e| {
                DbError::Configuration(format!("RELINK_DB_MAX_CONNECTIONS: {e}"))
            })?;

        let acquire_timeout_secs = reader("RELINK_DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .unwrap_or(10);

        let connect_attempts = reader("RELINK_DB_CONNECT_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .unwrap_or(3);

        let staging_schema = reader("RELINK_STAGING_SCHEMA")
            .unwrap_or_else(|_| "staging".to_string());

        let mirror_schema = reader("RELINK_MIRROR_SCHEMA")
            .unwrap_or_else(|_| "mirror".to_string());

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout_secs,
            connect_attempts,
            staging_schema,
            mirror_schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(
        vars: &'a [(&'a str, &'a str)],
    ) -> impl Fn(&str) -> Result<String, std::env::VarError> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
                .ok_or(std::env::VarError::NotPresent)
        }
    }

    #[test]
    fn url_is_required() {
        let result = DbConfig::from_reader(env(&[]));
        assert!(matches!(result, Err(DbError::Configuration(_))));
    }

    #[test]
    fn defaults_apply() {
        let config =
            DbConfig::from_reader(env(&[("DATABASE_URL", "postgres://localhost/relink")]))
                .unwrap();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.connect_attempts, 3);
        assert_eq!(config.staging_schema, "staging");
        assert_eq!(config.mirror_schema, "mirror");
    }

    #[test]
    fn invalid_pool_size_is_rejected() {
        let result = DbConfig::from_reader(env(&[
            ("DATABASE_URL", "postgres://localhost/relink"),
            ("RELINK_DB_MAX_CONNECTIONS", "many"),
        ]));
        assert!(result.is_err());
    }
}
