use std::collections::HashSet;

use axum::{debug_handler, extract::{Path, State}, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{messages::{Message, MessageRow}, users::{self, UserSummary}, AppResult, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chats/{user_id}", get(chats))
}

/// One entry of a user's chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub user: UserSummary,
    pub last_message: Message,
}

/// One conversation per distinct peer, carrying the newest message exchanged
/// with that peer. Newest conversation first. Peers whose user record is gone
/// are left out.
pub async fn list_conversations(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Conversation>> {
    // equal timestamps: the later insert counts as newer
    let rows: Vec<MessageRow> = sqlx::query_as(
        "SELECT id,sender_id,receiver_id,text,reply_to_id,reply_to_text,timestamp,read FROM messages
        WHERE sender_id=? OR receiver_id=?
        ORDER BY timestamp DESC, rowid DESC"
    )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(db_pool)
        .await?;

    let mut seen = HashSet::new();
    let latest: Vec<(String, MessageRow)> = rows.into_iter()
        .filter_map(|row| {
            let peer = if row.sender_id == user_id { row.receiver_id.clone() } else { row.sender_id.clone() };
            seen.insert(peer.clone()).then_some((peer, row))
        })
        .collect();

    let mut conversations = Vec::with_capacity(latest.len());
    for (peer, row) in latest {
        let Some(peer_user) = users::find_user_optional(db_pool, &peer).await? else {
            tracing::debug!("dropping conversation of {user_id} with vanished user {peer}");
            continue;
        };

        conversations.push(Conversation {
            user: peer_user.summary(),
            last_message: Message::try_from(row)?,
        });
    }

    Ok(conversations)
}

#[debug_handler]
async fn chats(
    State(db_pool): State<SqlitePool>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Conversation>>> {
    Ok(Json(list_conversations(&db_pool, &user_id).await?))
}
