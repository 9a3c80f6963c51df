use axum::{debug_handler, extract::{Path, State}, Json};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{AppError, AppResult};

use super::{find_user_optional, User, UserSummary};

pub async fn find_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<User> {
    find_user_optional(db_pool, user_id).await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))
}

/// Removes the user record only. Messages keep their (now dangling) ids.
pub async fn delete_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM users WHERE user_id=?")
        .bind(user_id)
        .execute(db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("user {user_id} not found")));
    }

    tracing::info!("deleted user {user_id}");
    Ok(())
}

#[debug_handler]
pub(crate) async fn user(
    State(db_pool): State<SqlitePool>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserSummary>> {
    Ok(Json(find_user(&db_pool, &user_id).await?.summary()))
}

#[debug_handler]
pub(crate) async fn remove(
    State(db_pool): State<SqlitePool>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Value>> {
    delete_user(&db_pool, &user_id).await?;
    Ok(Json(json!({ "success": true })))
}
