//! Database schema, migrations and column encoding helpers.

use super::{DbError, DbPool};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

/// Runs database migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    info!("Running SQLite migrations");
    sqlx::migrate!("src/db/migrations")
        .run(pool.sqlite())
        .await?;
    info!("Migrations completed successfully");
    Ok(())
}

/// Encodes a timestamp as fixed-width RFC 3339 so text order matches time order.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Serialization(format!("Invalid timestamp: {}", e)))
}

pub(crate) fn decode_optional_timestamp(
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    raw.as_deref().map(decode_timestamp).transpose()
}

pub(crate) fn decode_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Serialization(format!("Invalid UUID: {}", e)))
}

pub(crate) fn decode_optional_uuid(raw: Option<String>) -> Result<Option<Uuid>, DbError> {
    raw.as_deref().map(decode_uuid).transpose()
}

pub(crate) fn decode_count(raw: i64) -> u64 {
    raw.max(0) as u64
}
