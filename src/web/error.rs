use axum::{
    extract::rejection::{FormRejection, PathRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::{error, warn};

use super::views;
use crate::db::DbError;

/// Failures a handler does not recover from itself.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Bad path: {0}")]
    Path(#[from] PathRejection),
    #[error("Bad form: {0}")]
    Form(#[from] FormRejection),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Database(DbError::NotFound(what)) => {
                warn!("{}", what);
                not_found()
            }
            AppError::Database(e) => {
                error!(error = %e, "Database failure");
                server_error()
            }
            // Ids in paths are integers; anything else names no page.
            AppError::Path(e) => {
                warn!(error = %e, "Unparseable path");
                not_found()
            }
            AppError::Form(e) => {
                warn!(error = %e, "Rejected form");
                bad_request()
            }
        }
    }
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Html(views::not_found_page())).into_response()
}

pub fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, Html(views::bad_request_page())).into_response()
}

pub fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(views::server_error_page())).into_response()
}

/// Response for a panic caught by `CatchPanicLayer`.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");
    server_error()
}
