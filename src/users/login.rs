use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{db, AppError, AppResult};

use super::{find_user_by_name, insert_user, User, UserSummary};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
}

/// Login-or-create entry point. An unknown name is registered on the spot
/// with `password`; a known one must present the same password.
///
/// Passwords are stored and compared as plaintext. Users created through
/// `register_user` have no password and can never log in here.
pub async fn login_user(db_pool: &SqlitePool, name: &str, password: &str) -> AppResult<User> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_owned()));
    }

    match find_user_by_name(db_pool, name).await? {
        Some(user) => check_password(db_pool, user, password).await,
        None => create_on_login(db_pool, name, password).await,
    }
}

async fn create_on_login(db_pool: &SqlitePool, name: &str, password: &str) -> AppResult<User> {
    match insert_user(db_pool, name, Some(password)).await {
        Ok(user) => {
            tracing::info!("created {}#{} on first login", user.name, user.user_id);
            Ok(user)
        }
        // lost a race against another login for the same name
        Err(AppError::Conflict(msg)) => {
            let user = find_user_by_name(db_pool, name).await?
                .ok_or(AppError::Conflict(msg))?;
            check_password(db_pool, user, password).await
        }
        Err(err) => Err(err),
    }
}

async fn check_password(db_pool: &SqlitePool, user: User, password: &str) -> AppResult<User> {
    if user.password.as_deref() != Some(password) {
        tracing::warn!("wrong password for {}#{}", user.name, user.user_id);
        return Err(AppError::Auth("wrong password".to_owned()));
    }

    let last_active = db::now();
    sqlx::query("UPDATE users SET last_active=? WHERE user_id=?")
        .bind(db::to_millis(last_active))
        .bind(&user.user_id)
        .execute(db_pool)
        .await?;

    tracing::info!("welcome back {}#{}", user.name, user.user_id);
    Ok(User { last_active, ..user })
}

#[debug_handler]
pub(crate) async fn login(
    State(db_pool): State<SqlitePool>,
    Json(LoginRequest { name, password }): Json<LoginRequest>,
) -> AppResult<Json<UserSummary>> {
    let user = login_user(&db_pool, &name, &password).await?;
    Ok(Json(user.summary()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::users::{find_user, register_user};

    use super::*;

    #[tokio::test]
    async fn first_login_creates_the_user() {
        let db_pool = db::test_pool().await;
        let user = login_user(&db_pool, "ada", "hunter2").await.unwrap();

        let found = find_user(&db_pool, &user.user_id).await.unwrap();
        assert_eq!(found.name, "ada");
        assert_eq!(found.password.as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn second_login_touches_last_active() {
        let db_pool = db::test_pool().await;
        let created = login_user(&db_pool, "ada", "hunter2").await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let again = login_user(&db_pool, " ada ", "hunter2").await.unwrap();

        assert_eq!(again.user_id, created.user_id);
        assert!(again.last_active > created.last_active);

        let stored = find_user(&db_pool, &created.user_id).await.unwrap();
        assert_eq!(stored.last_active, again.last_active);
        assert_eq!(stored.created_at, created.created_at);
    }

    #[tokio::test]
    async fn wrong_password_changes_nothing() {
        let db_pool = db::test_pool().await;
        let created = login_user(&db_pool, "ada", "hunter2").await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let err = login_user(&db_pool, "ada", "hunter3").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)), "{err:?}");

        let stored = find_user(&db_pool, &created.user_id).await.unwrap();
        assert_eq!(stored.last_active, created.last_active);
        assert_eq!(stored.password.as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn registered_users_have_no_password_to_match() {
        let db_pool = db::test_pool().await;
        register_user(&db_pool, "ada").await.unwrap();

        let err = login_user(&db_pool, "ada", "").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)), "{err:?}");
    }

    #[tokio::test]
    async fn losing_the_creation_race_still_checks_the_password() {
        let db_pool = db::test_pool().await;
        // the winner inserted between our lookup and our insert
        let winner = login_user(&db_pool, "ada", "hunter2").await.unwrap();

        let err = create_on_login(&db_pool, "ada", "hunter3").await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)), "{err:?}");

        tokio::time::sleep(Duration::from_millis(20)).await;
        let user = create_on_login(&db_pool, "ada", "hunter2").await.unwrap();
        assert_eq!(user.user_id, winner.user_id);
        assert!(user.last_active > winner.last_active);

        let all: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE name=?")
            .bind("ada")
            .fetch_one(&db_pool)
            .await
            .unwrap();
        assert_eq!(all, 1);
    }
}
