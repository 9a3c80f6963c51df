use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{db, users, AppError, AppResult};

use super::{Message, ReplyTo};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reply_to: Option<ReplyTo>,
}

pub async fn send_message(db_pool: &SqlitePool, request: SendMessageRequest) -> AppResult<Message> {
    send_message_at(db_pool, request, db::now()).await
}

pub(crate) async fn send_message_at(
    db_pool: &SqlitePool,
    SendMessageRequest { sender_id, receiver_id, text, reply_to }: SendMessageRequest,
    timestamp: OffsetDateTime,
) -> AppResult<Message> {
    let text = text.trim();
    if sender_id.is_empty() || receiver_id.is_empty() || text.is_empty() {
        return Err(AppError::Validation("incomplete data: senderId, receiverId and text are required".to_owned()));
    }

    for user_id in [&sender_id, &receiver_id] {
        if users::find_user_optional(db_pool, user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("unknown user {user_id}")));
        }
    }

    // the quoted message is not looked up: it may already be gone
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO messages (id,sender_id,receiver_id,text,reply_to_id,reply_to_text,timestamp,read) VALUES (?,?,?,?,?,?,?,0)")
        .bind(id.to_string())
        .bind(&sender_id)
        .bind(&receiver_id)
        .bind(text)
        .bind(reply_to.as_ref().map(|r| r.message_id.as_str()))
        .bind(reply_to.as_ref().map(|r| r.message_text.as_str()))
        .bind(db::to_millis(timestamp))
        .execute(db_pool)
        .await?;

    Ok(Message {
        id,
        sender_id,
        receiver_id,
        text: text.to_owned(),
        reply_to,
        timestamp,
        read: false,
    })
}

#[debug_handler]
pub(crate) async fn send(
    State(db_pool): State<SqlitePool>,
    Json(request): Json<SendMessageRequest>,
) -> AppResult<Json<Message>> {
    Ok(Json(send_message(&db_pool, request).await?))
}
