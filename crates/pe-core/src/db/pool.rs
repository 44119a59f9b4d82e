//! Database connection pool management.

use super::DbError;
use std::time::Duration;

#[cfg(feature = "database")]
use sqlx::{Pool, Postgres, Sqlite};

/// Unified database pool that can work with SQLite or PostgreSQL.
#[cfg(feature = "database")]
#[derive(Clone)]
pub enum DbPool {
    /// SQLite connection pool (for development/testing).
    Sqlite(Pool<Sqlite>),
    /// PostgreSQL connection pool (for production).
    Postgres(Pool<Postgres>),
}

#[cfg(not(feature = "database"))]
#[derive(Clone)]
pub struct DbPool;

/// Options for creating a database connection pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Maximum time to wait for a connection.
    pub acquire_timeout: Duration,
    /// Idle timeout for connections.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let acquire_timeout_secs = std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            max_connections,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

/// Returns true for SQLite URLs that point at a private in-memory database.
fn is_sqlite_memory(database_url: &str) -> bool {
    database_url.starts_with("sqlite") && database_url.contains(":memory:")
}

/// Creates a database connection pool from a database URL.
///
/// The URL scheme determines the database type:
/// - `sqlite://` or `sqlite:` for SQLite
/// - `postgres://` or `postgresql://` for PostgreSQL
#[cfg(feature = "database")]
pub async fn create_pool(database_url: &str) -> Result<DbPool, DbError> {
    create_pool_with_options(database_url, PoolOptions::default()).await
}

#[cfg(not(feature = "database"))]
pub async fn create_pool(_database_url: &str) -> Result<DbPool, DbError> {
    Err(DbError::Configuration(
        "Database support not enabled. Compile with --features database".to_string(),
    ))
}

/// Creates a database connection pool with custom options.
#[cfg(feature = "database")]
pub async fn create_pool_with_options(
    database_url: &str,
    options: PoolOptions,
) -> Result<DbPool, DbError> {
    use sqlx::postgres::PgPoolOptions;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tracing::info;

    if database_url.starts_with("sqlite") {
        // Every connection to `:memory:` opens a separate database.
        let max_connections = if is_sqlite_memory(database_url) {
            1
        } else {
            options.max_connections
        };

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DbError::Configuration(e.to_string()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(options.min_connections.min(max_connections))
            .acquire_timeout(options.acquire_timeout)
            .idle_timeout(options.idle_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        info!(max_connections, "Connected to SQLite database");
        Ok(DbPool::Sqlite(pool))
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")
    {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.acquire_timeout)
            .idle_timeout(options.idle_timeout)
            .connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        info!(
            max_connections = options.max_connections,
            "Connected to PostgreSQL database"
        );
        Ok(DbPool::Postgres(pool))
    } else {
        Err(DbError::Configuration(format!(
            "Unsupported database URL scheme: {}",
            database_url.split(':').next().unwrap_or_default()
        )))
    }
}
