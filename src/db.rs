use std::str::FromStr;

use anyhow::Context;
use axum::http::StatusCode;
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, SqlitePool};
use time::OffsetDateTime;

use crate::{config::Config, AppResult};

/// Opens the shared pool without touching the database. The first query
/// establishes a connection; broken connections are replaced by the pool.
pub fn connect_lazy(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("parse DATABASE_URL {}", config.database_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.db_timeout);

    Ok(
        SqlitePoolOptions::new()
            .max_connections(16)
            .acquire_timeout(config.db_timeout)
            .connect_lazy_with(options)
    )
}

pub async fn migrate(db_pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(db_pool).await?;
    Ok(())
}

pub async fn health(db_pool: &SqlitePool) -> StatusCode {
    match db_pool.acquire().await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::warn!("health check could not reach the store: {err}");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub(crate) fn to_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_millis(ms: i64) -> AppResult<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)?)
}

/// Current time truncated to the precision the store keeps.
pub(crate) fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(now.millisecond() as u32 * 1_000_000)
        .unwrap_or(now)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // one connection that never expires, otherwise the in-memory database goes with it
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    migrate(&db_pool).await.expect("migrate");
    db_pool
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[tokio::test]
    async fn lazy_pool_opens_file_on_first_use() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("chat.db");
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some(format!("sqlite://{}", path.display())),
            _ => None,
        }).unwrap();

        let db_pool = connect_lazy(&config).unwrap();
        assert!(!path.exists());

        migrate(&db_pool).await.unwrap();
        assert!(path.exists());

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('users','messages')"
        )
            .fetch_all(&db_pool)
            .await
            .unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(health(&db_pool).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db_pool = test_pool().await;
        migrate(&db_pool).await.unwrap();
    }

    #[test]
    fn millis_keep_millisecond_precision() {
        let t = datetime!(2025-03-01 12:30:45.123 UTC);
        assert_eq!(from_millis(to_millis(t)).unwrap(), t);

        let n = now();
        assert_eq!(from_millis(to_millis(n)).unwrap(), n);
    }
}
