mod history;
mod remove;
mod send;

use axum::{routing::{delete, get, post}, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db, AppError, AppResult, AppState};

pub use remove::delete_message;
pub use history::fetch_messages;
pub use send::{send_message, SendMessageRequest};

pub(crate) use send::send_message_at;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send::send))
        .route("/messages/{message_id}", delete(remove::remove))
        .route("/messages/{user_a}/{user_b}", get(history::history))
}

/// Copy of the quoted message taken when the reply was sent. Never
/// re-resolved, so it outlives the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTo {
    pub message_id: String,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTo>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub read: bool,
}

#[derive(sqlx::FromRow)]
pub(crate) struct MessageRow {
    pub(crate) id: String,
    pub(crate) sender_id: String,
    pub(crate) receiver_id: String,
    pub(crate) text: String,
    pub(crate) reply_to_id: Option<String>,
    pub(crate) reply_to_text: Option<String>,
    pub(crate) timestamp: i64,
    pub(crate) read: bool,
}

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> AppResult<Message> {
        Ok(Message {
            id: Uuid::parse_str(&row.id)?,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            text: row.text,
            reply_to: row.reply_to_id.map(|message_id| ReplyTo {
                message_id,
                message_text: row.reply_to_text.unwrap_or_default(),
            }),
            timestamp: db::from_millis(row.timestamp)?,
            read: row.read,
        })
    }
}

/// Deletes every message strictly older than `cutoff`.
pub async fn delete_messages_older_than(db_pool: &SqlitePool, cutoff: OffsetDateTime) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM messages WHERE timestamp < ?")
        .bind(db::to_millis(cutoff))
        .execute(db_pool)
        .await?;
    Ok(result.rows_affected())
}
