use axum::{debug_handler, extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};

use crate::{db, messages::delete_messages_older_than, AppError, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cleanup", get(cleanup))
}

/// How long messages are kept before the sweep may delete them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention(pub Duration);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub message: String,
    pub deleted_count: u64,
}

pub async fn sweep_old(db_pool: &SqlitePool, Retention(window): Retention) -> AppResult<u64> {
    sweep_old_at(db_pool, db::now(), window).await
}

pub(crate) async fn sweep_old_at(db_pool: &SqlitePool, now: OffsetDateTime, window: Duration) -> AppResult<u64> {
    let cutoff = now.checked_sub(window)
        .ok_or_else(|| AppError::Validation(format!("retention window {window} reaches past the earliest representable time")))?;
    let deleted = delete_messages_older_than(db_pool, cutoff).await?;
    tracing::info!("swept {deleted} messages older than {cutoff}");
    Ok(deleted)
}

#[debug_handler(state = AppState)]
async fn cleanup(
    State(db_pool): State<SqlitePool>,
    State(retention): State<Retention>,
) -> AppResult<Json<SweepReport>> {
    let deleted_count = sweep_old(&db_pool, retention).await?;
    Ok(Json(SweepReport {
        message: format!("Deleted {deleted_count} old messages"),
        deleted_count,
    }))
}
