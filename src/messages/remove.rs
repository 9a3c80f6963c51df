use axum::{debug_handler, extract::{Path, State}, Json};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{AppError, AppResult};

/// Deletes one message. Replies quoting it keep their snapshot.
pub async fn delete_message(db_pool: &SqlitePool, message_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM messages WHERE id=?")
        .bind(message_id)
        .execute(db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("message {message_id} not found")));
    }
    Ok(())
}

#[debug_handler]
pub(crate) async fn remove(
    State(db_pool): State<SqlitePool>,
    Path(message_id): Path<String>,
) -> AppResult<Json<Value>> {
    delete_message(&db_pool, &message_id).await?;
    Ok(Json(json!({ "success": true })))
}
