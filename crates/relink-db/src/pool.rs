//! Connection pool management.

use crate::config::DbConfig;
use crate::error::DbError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::instrument;

/// Wrapper around the Postgres connection pool.
#[derive(Debug, Clone)]
pub struct DbPool {
    inner: PgPool,
}

impl DbPool {
    /// Connect with bounded retries and exponential backoff.
    ///
    /// The staging database being briefly unavailable at startup is
    /// common on orchestrated deployments; anything beyond the
    /// configured attempts escalates.
    #[instrument(skip(config), fields(attempts = config.connect_attempts))]
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let attempts = config.connect_attempts.max(1);
        let mut backoff = Duration::from_millis(500);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
                .connect(&config.database_url)
                .await
            {
                Ok(inner) => {
                    tracing::info!(attempt, "Connected to staging database");
                    return Ok(Self { inner });
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "Database connection attempt failed");
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(DbError::ConnectionFailed(
            last_error.unwrap_or(sqlx::Error::PoolClosed),
        ))
    }

    /// Connect to a URL with default settings, mainly for tests.
    pub async fn connect_url(url: &str) -> Result<Self, DbError> {
        let inner = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(DbError::ConnectionFailed)?;
        Ok(Self { inner })
    }

    /// Access the underlying pool.
    #[must_use]
    pub fn inner(&self) -> &PgPool {
        &self.inner
    }

    /// Close all connections.
    pub async fn close(&self) {
        self.inner.close().await;
    }
}
