//! Database connection pool management.

use super::DbError;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::info;

/// Escapes special characters in a search pattern for use in SQL LIKE clauses.
///
/// `%`, `_`, `[`, `]` and `\` are prefixed with a backslash so that user input
/// matches literally. Queries must declare `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use kh_core::db::escape_like_pattern;
///
/// assert_eq!(escape_like_pattern("50%_off"), r"50\%\_off");
/// ```
pub fn escape_like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '%' | '_' | '[' | ']' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Creates a LIKE pattern that matches anywhere in the string.
///
/// ```
/// use kh_core::db::make_like_pattern;
///
/// assert_eq!(make_like_pattern("rust_lang"), r"%rust\_lang%");
/// ```
pub fn make_like_pattern(search: &str) -> String {
    format!("%{}%", escape_like_pattern(search))
}

/// Shared SQLite connection pool.
#[derive(Clone, Debug)]
pub struct DbPool {
    pool: SqlitePool,
}

impl From<SqlitePool> for DbPool {
    fn from(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Options for creating a database connection pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// Maximum time to wait for a connection.
    pub acquire_timeout: Duration,
    /// Maximum lifetime of a connection.
    pub max_lifetime: Option<Duration>,
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
            max_lifetime: Some(Duration::from_secs(1800)),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl PoolOptions {
    /// Options for an in-memory database.
    ///
    /// Each SQLite connection to `:memory:` opens its own database, so the pool
    /// holds exactly one connection that is never recycled.
    pub fn in_memory() -> Self {
        Self {
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: None,
            idle_timeout: None,
        }
    }

    /// Overrides the maximum number of connections.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self.min_connections = self.min_connections.min(self.max_connections);
        self
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Creates a database connection pool from a `sqlite:` URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, DbError> {
    let options = if is_in_memory(database_url) {
        PoolOptions::in_memory()
    } else {
        PoolOptions::default()
    };
    create_pool_with_options(database_url, options).await
}

/// Creates a database connection pool with custom options.
pub async fn create_pool_with_options(
    database_url: &str,
    options: PoolOptions,
) -> Result<DbPool, DbError> {
    if !database_url.starts_with("sqlite:") {
        return Err(DbError::Configuration(format!(
            "Unsupported database URL scheme. Expected sqlite:, got: {}",
            database_url.split(':').next().unwrap_or("unknown")
        )));
    }

    info!(
        max_connections = options.max_connections,
        "Creating SQLite connection pool"
    );
    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .min_connections(options.min_connections)
        .acquire_timeout(options.acquire_timeout)
        .max_lifetime(options.max_lifetime)
        .idle_timeout(options.idle_timeout)
        .connect(database_url)
        .await?;

    Ok(DbPool { pool })
}

impl DbPool {
    /// Returns the underlying sqlx pool.
    pub fn sqlite(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    /// Closes the connection pool.
    pub async fn close(&self) {
        self.pool.close().await
    }

    /// Returns the number of open connections.
    pub fn pool_size(&self) -> u32 {
        self.pool.size()
    }

    /// Returns number of idle connections.
    pub fn idle_connections(&self) -> usize {
        self.pool.num_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern_no_special() {
        assert_eq!(escape_like_pattern("hello"), "hello");
        assert_eq!(escape_like_pattern(""), "");
    }

    #[test]
    fn test_escape_like_pattern_wildcards() {
        assert_eq!(escape_like_pattern("100%"), r"100\%");
        assert_eq!(escape_like_pattern("snake_case"), r"snake\_case");
        assert_eq!(escape_like_pattern("[a-z]"), r"\[a-z\]");
        assert_eq!(escape_like_pattern(r"c:\path"), r"c:\\path");
    }

    #[test]
    fn test_make_like_pattern() {
        assert_eq!(make_like_pattern("bmw"), "%bmw%");
        assert_eq!(make_like_pattern("100%"), r"%100\%%");
    }

    #[test]
    fn test_in_memory_detection() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite:file:test?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://knowledge-hub.db?mode=rwc"));
    }

    #[test]
    fn test_in_memory_options_use_single_connection() {
        let opts = PoolOptions::in_memory();
        assert_eq!(opts.max_connections, 1);
        assert!(opts.max_lifetime.is_none());
        assert!(opts.idle_timeout.is_none());
    }

    #[test]
    fn test_with_max_connections_keeps_min_in_range() {
        let opts = PoolOptions::in_memory().with_max_connections(0);
        assert_eq!(opts.max_connections, 1);
        assert!(opts.min_connections <= opts.max_connections);
    }

    #[tokio::test]
    async fn test_rejects_non_sqlite_url() {
        let result = create_pool("postgres://localhost/kh").await;
        assert!(matches!(result, Err(DbError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_in_memory_pool_is_healthy() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        assert!(pool.is_healthy().await);
    }
}
