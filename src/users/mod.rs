mod login;
mod lookup;
mod register;
mod search;

use axum::{routing::{get, post}, Router};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{appresult::is_unique_violation, db, AppError, AppResult, AppState};

pub use login::login_user;
pub use lookup::{delete_user, find_user};
pub use register::register_user;
pub use search::{search_users, SEARCH_LIMIT};

pub const USER_ID_LEN: usize = 6;
const USER_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_ID_ATTEMPTS: u32 = 16;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/users/search", get(search::search))
        .route("/users/{user_id}", get(lookup::user).delete(lookup::remove))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    pub user_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_active: OffsetDateTime,
    // plaintext, see login
    #[serde(skip)]
    pub(crate) password: Option<String>,
}

/// The public face of a user: what other users get to see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub name: String,
    pub user_id: String,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            name: self.name.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    user_id: String,
    name: String,
    password: Option<String>,
    created_at: i64,
    last_active: i64,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<User> {
        Ok(User {
            name: row.name,
            user_id: row.user_id,
            created_at: db::from_millis(row.created_at)?,
            last_active: db::from_millis(row.last_active)?,
            password: row.password,
        })
    }
}

pub(crate) async fn find_user_optional(db_pool: &SqlitePool, user_id: &str) -> AppResult<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as("SELECT user_id,name,password,created_at,last_active FROM users WHERE user_id=?")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    row.map(User::try_from).transpose()
}

pub(crate) async fn find_user_by_name(db_pool: &SqlitePool, name: &str) -> AppResult<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as("SELECT user_id,name,password,created_at,last_active FROM users WHERE name=?")
        .bind(name)
        .fetch_optional(db_pool)
        .await?;
    row.map(User::try_from).transpose()
}

pub(crate) fn generate_user_id() -> String {
    let mut rng = rand::rng();
    (0..USER_ID_LEN)
        .map(|_| USER_ID_CHARSET[rng.random_range(0..USER_ID_CHARSET.len())] as char)
        .collect()
}

fn duplicate_name(name: &str) -> AppError {
    AppError::Conflict(format!("name {name:?} is already taken"))
}

/// Inserts a fresh user under a newly allocated id. `name` must already be trimmed.
pub(crate) async fn insert_user(db_pool: &SqlitePool, name: &str, password: Option<&str>) -> AppResult<User> {
    insert_user_with(db_pool, name, password, generate_user_id).await
}

async fn insert_user_with(
    db_pool: &SqlitePool,
    name: &str,
    password: Option<&str>,
    mut next_id: impl FnMut() -> String,
) -> AppResult<User> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let user_id = next_id();

        // the primary key is what actually guarantees uniqueness, this only saves an insert
        if find_user_optional(db_pool, &user_id).await?.is_some() {
            tracing::warn!("user id {user_id} already allocated, drawing again");
            continue;
        }

        let now = db::now();
        let result = sqlx::query("INSERT INTO users (user_id,name,password,created_at,last_active) VALUES (?,?,?,?,?)")
            .bind(&user_id)
            .bind(name)
            .bind(password)
            .bind(db::to_millis(now))
            .bind(db::to_millis(now))
            .execute(db_pool)
            .await;

        match result {
            Ok(_) => {
                return Ok(User {
                    name: name.to_owned(),
                    user_id,
                    created_at: now,
                    last_active: now,
                    password: password.map(str::to_owned),
                });
            }
            Err(err) if is_unique_violation(&err, "users.name") => return Err(duplicate_name(name)),
            Err(err) if is_unique_violation(&err, "users.user_id") => {
                tracing::warn!("user id {user_id} taken by a concurrent insert, drawing again");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Conflict(format!("no free user id after {MAX_ID_ATTEMPTS} attempts")))
}
