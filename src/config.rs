use std::str::FromStr;

use anyhow::{anyhow, Context};
use time::{Duration, OffsetDateTime};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://pocketchat.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_RETENTION_HOURS: i64 = 7 * 24;
pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 10;

/// Deployment settings, read from `.env` and the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub retention_window: Duration,
    pub db_timeout: std::time::Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        Config::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let retention_hours: i64 = parse_or(&lookup, "RETENTION_WINDOW_HOURS", DEFAULT_RETENTION_HOURS)?;
        if retention_hours <= 0 {
            return Err(anyhow!("RETENTION_WINDOW_HOURS must be positive, got {retention_hours}"));
        }
        let retention_window = retention_hours.checked_mul(3600)
            .map(Duration::seconds)
            .filter(|window| OffsetDateTime::now_utc().checked_sub(*window).is_some())
            .ok_or_else(|| anyhow!("RETENTION_WINDOW_HOURS {retention_hours} is out of range"))?;

        Ok(Config {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned()),
            retention_window,
            db_timeout: std::time::Duration::from_secs(
                parse_or(&lookup, "DB_TIMEOUT_SECS", DEFAULT_DB_TIMEOUT_SECS)?
            ),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
