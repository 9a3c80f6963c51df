use axum::{debug_handler, extract::{Query, State}, Json};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::AppResult;

use super::UserSummary;

pub const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// Case-insensitive substring match on either the id or the name.
/// At most `SEARCH_LIMIT` hits, in no particular order.
pub async fn search_users(db_pool: &SqlitePool, query: &str) -> AppResult<Vec<UserSummary>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    // folded here rather than with SQLite's lower(), which only knows ASCII
    let needle = query.to_lowercase();
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT name,user_id FROM users")
        .fetch_all(db_pool)
        .await?;

    Ok(
        rows.into_iter()
            .filter(|(name, user_id)| {
                name.to_lowercase().contains(&needle) || user_id.to_lowercase().contains(&needle)
            })
            .take(SEARCH_LIMIT)
            .map(|(name, user_id)| UserSummary { name, user_id })
            .collect()
    )
}

#[debug_handler]
pub(crate) async fn search(
    State(db_pool): State<SqlitePool>,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(search_users(&db_pool, &q).await?))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::{db, users::register_user};

    use super::*;

    #[tokio::test]
    async fn matches_names_and_ids_ignoring_case() {
        let db_pool = db::test_pool().await;
        let ada = register_user(&db_pool, "Ada Lovelace").await.unwrap();
        let grace = register_user(&db_pool, "Grace Hopper").await.unwrap();
        register_user(&db_pool, "Linus").await.unwrap();

        let hits: HashSet<_> = search_users(&db_pool, "LOVELACE").await.unwrap().into_iter().collect();
        assert_eq!(hits, HashSet::from([ada.summary()]));

        let hits: HashSet<_> = search_users(&db_pool, &grace.user_id.to_lowercase()).await.unwrap().into_iter().collect();
        assert!(hits.contains(&grace.summary()));

        let hits: HashSet<_> = search_users(&db_pool, "a").await.unwrap().into_iter().collect();
        assert!(hits.contains(&ada.summary()));
        assert!(hits.contains(&grace.summary()));

        let anger = register_user(&db_pool, "Ärger").await.unwrap();
        for query in ["Ärger", "ärger", "ÄRGER", "rGe"] {
            let hits = search_users(&db_pool, query).await.unwrap();
            assert!(hits.contains(&anger.summary()), "{query}: {hits:?}");
        }
    }

    #[tokio::test]
    async fn results_are_capped() {
        let db_pool = db::test_pool().await;
        for i in 0..15 {
            register_user(&db_pool, &format!("user {i}")).await.unwrap();
        }

        let hits = search_users(&db_pool, "user").await.unwrap();
        assert_eq!(hits.len(), SEARCH_LIMIT);
    }

    #[tokio::test]
    async fn blank_query_finds_nothing() {
        let db_pool = db::test_pool().await;
        register_user(&db_pool, "ada").await.unwrap();

        assert!(search_users(&db_pool, "  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wildcards_are_literal() {
        let db_pool = db::test_pool().await;
        register_user(&db_pool, "ada").await.unwrap();

        assert!(search_users(&db_pool, "%").await.unwrap().is_empty());
        assert!(search_users(&db_pool, "_").await.unwrap().is_empty());
    }
}
