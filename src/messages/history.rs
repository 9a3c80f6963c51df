use axum::{debug_handler, extract::{Path, State}, Json};
use sqlx::SqlitePool;

use crate::AppResult;

use super::{Message, MessageRow};

/// Full history between two users, oldest first. Symmetric in its arguments.
pub async fn fetch_messages(db_pool: &SqlitePool, user_a: &str, user_b: &str) -> AppResult<Vec<Message>> {
    let rows: Vec<MessageRow> = sqlx::query_as(
        "SELECT id,sender_id,receiver_id,text,reply_to_id,reply_to_text,timestamp,read FROM messages
        WHERE (sender_id=? AND receiver_id=?) OR (sender_id=? AND receiver_id=?)
        ORDER BY timestamp ASC, rowid ASC"
    )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_all(db_pool)
        .await?;

    rows.into_iter().map(Message::try_from).collect()
}

#[debug_handler]
pub(crate) async fn history(
    State(db_pool): State<SqlitePool>,
    Path((user_a, user_b)): Path<(String, String)>,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(fetch_messages(&db_pool, &user_a, &user_b).await?))
}
