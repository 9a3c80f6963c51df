use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(String),

    #[error("store error: {0}")]
    Store(anyhow::Error),
}

impl AppError {
    /// Stable machine-readable kind, sent alongside the message.
    pub fn kind(&self) -> &'static str {
        use AppError::*;
        match self {
            Validation(_) => "validation",
            Conflict(_) => "conflict",
            NotFound(_) => "not_found",
            Auth(_) => "auth",
            Store(_) => "store",
        }
    }

    pub fn status(&self) -> StatusCode {
        use AppError::*;
        match self {
            Validation(_) => StatusCode::BAD_REQUEST,
            Conflict(_) => StatusCode::CONFLICT,
            NotFound(_) => StatusCode::NOT_FOUND,
            Auth(_) => StatusCode::UNAUTHORIZED,
            Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Store(err) => {
                tracing::error!("{err:#}\n\n{}", err.backtrace());
                "internal server error".to_owned()
            }
            other => other.to_string(),
        };

        (
            self.status(),
            Json(json!({ "kind": self.kind(), "error": message })),
        )
            .into_response()
    }
}

macro_rules! store_err_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Store(anyhow::Error::from(err))
            }
        }
    };
}

store_err_impl!(sqlx::Error);
store_err_impl!(sqlx::migrate::MigrateError);
store_err_impl!(time::error::ComponentRange);
store_err_impl!(uuid::Error);

/// True when `err` is a UNIQUE/PRIMARY KEY violation on `table.column`.
pub(crate) fn is_unique_violation(err: &sqlx::Error, column: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation() && db_err.message().contains(column),
        _ => false,
    }
}
