//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, the transaction
//! type the domain services run against, and the generic record
//! operations used by the route handlers.
//!
//! Only table and column names that come from compile-time constants are
//! ever formatted into SQL. Every value is bound as a parameter.

mod attachments;
mod records;
mod reference;
mod tx;

use std::time::{Duration, Instant};

use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::NoTls;

use haven_core::StorageError;

use crate::error::{ApiError, ApiResult};
use crate::telemetry::METRICS;

pub use reference::ReferenceTable;
pub use tx::PgTx;

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create/recycle timeout for pooled connections
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "haven".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HAVEN_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("HAVEN_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("HAVEN_DB_NAME").unwrap_or_else(|_| "haven".to_string()),
            user: std::env::var("HAVEN_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("HAVEN_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("HAVEN_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("HAVEN_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        pool_cfg.timeouts.recycle = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

/// Connection counts reported by the readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolStats {
    pub max_size: usize,
    pub open: usize,
    pub idle: usize,
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Snapshot of the connection pool.
    pub fn pool_stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            max_size: status.max_size,
            open: status.size,
            idle: status.available,
        }
    }

    async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Simple round trip used by the readiness check.
    pub async fn health_check(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(())
    }

    /// Apply a SQL script (used by DB-backed tests to install the schema).
    pub async fn execute_script(&self, sql: &str) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.batch_execute(sql).await?;
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Record the outcome and latency of a database operation.
fn observe<T>(operation: &str, entity: &str, start: Instant, result: &ApiResult<T>) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_db_operation(
            operation,
            entity,
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
    }
}

/// Map a driver error inside a storage seam.
pub(crate) fn storage_error(entity: &'static str, e: tokio_postgres::Error) -> StorageError {
    if let Some(db_error) = e.as_db_error() {
        if db_error.code() == &SqlState::UNIQUE_VIOLATION {
            return StorageError::Conflict {
                entity,
                field: db_error.constraint().unwrap_or("unique key").to_string(),
            };
        }
    }
    tracing::error!(entity, error = %e, "Database statement failed");
    StorageError::Database {
        reason: e.to_string(),
    }
}

pub(crate) fn decode_error(entity: &'static str) -> impl Fn(tokio_postgres::Error) -> StorageError {
    move |e| StorageError::Decode {
        entity,
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.dbname, "haven");
        assert_eq!(config.port, 5432);
        assert_eq!(config.max_size, 16);
    }
}
