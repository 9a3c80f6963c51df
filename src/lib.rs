pub mod appresult;
pub mod chats;
pub mod cleanup;
pub mod config;
pub mod db;
pub mod messages;
pub mod users;

use axum::{debug_handler, extract::{FromRef, State}, http::StatusCode, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use cleanup::Retention;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub retention: Retention,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(users::router())
        .merge(messages::router())
        .merge(chats::router())
        .merge(cleanup::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[debug_handler]
async fn health(State(db_pool): State<SqlitePool>) -> StatusCode {
    db::health(&db_pool).await
}
