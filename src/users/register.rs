use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{AppError, AppResult};

use super::{duplicate_name, find_user_by_name, insert_user, User, UserSummary};

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    #[serde(default)]
    name: String,
}

/// Invite-only entry point: creates a user without a password.
pub async fn register_user(db_pool: &SqlitePool, name: &str) -> AppResult<User> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_owned()));
    }

    if find_user_by_name(db_pool, name).await?.is_some() {
        return Err(duplicate_name(name));
    }

    let user = insert_user(db_pool, name, None).await?;
    tracing::info!("registered {}#{}", user.name, user.user_id);
    Ok(user)
}

#[debug_handler]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    Json(RegisterRequest { name }): Json<RegisterRequest>,
) -> AppResult<Json<UserSummary>> {
    let user = register_user(&db_pool, &name).await?;
    Ok(Json(user.summary()))
}

#[cfg(test)]
mod tests {
    use crate::{db, users::{find_user, USER_ID_LEN}};

    use super::*;

    #[tokio::test]
    async fn registered_user_can_be_found_by_id() {
        let db_pool = db::test_pool().await;
        let user = register_user(&db_pool, "  Ada Lovelace ").await.unwrap();

        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.user_id.len(), USER_ID_LEN);
        assert!(user.user_id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(user.password.is_none());

        let found = find_user(&db_pool, &user.user_id).await.unwrap();
        assert_eq!(found.summary(), user.summary());
    }

    #[tokio::test]
    async fn same_trimmed_name_conflicts() {
        let db_pool = db::test_pool().await;
        register_user(&db_pool, "ada").await.unwrap();

        let err = register_user(&db_pool, " ada\t").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{err:?}");
    }

    #[tokio::test]
    async fn names_compare_exactly() {
        let db_pool = db::test_pool().await;
        register_user(&db_pool, "ada").await.unwrap();
        register_user(&db_pool, "Ada").await.unwrap();
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let db_pool = db::test_pool().await;
        for name in ["", "   ", "\n\t"] {
            let err = register_user(&db_pool, name).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn handler_answers_with_the_summary() {
        let db_pool = db::test_pool().await;
        let Json(summary) = register(
            State(db_pool.clone()),
            Json(RegisterRequest { name: "grace".to_owned() }),
        ).await.unwrap();

        assert_eq!(summary.name, "grace");
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["userId"], summary.user_id.as_str());
    }
}
