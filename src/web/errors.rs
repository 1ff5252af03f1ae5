use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

use super::auth::LOGIN_PATH;
use crate::db::DbError;

/// Application error type for web handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("login required")]
    LoginRequired,
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
    #[error("multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("unreadable multipart body: {0}")]
    MultipartBody(#[from] MultipartRejection),
    #[error("unreadable form body: {0}")]
    FormBody(#[from] FormRejection),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::LoginRequired => return Redirect::to(LOGIN_PATH).into_response(),
            AppError::NotFound(what) => {
                tracing::debug!(%what, "not found");
                (StatusCode::NOT_FOUND, "Not Found")
            }
            AppError::Multipart(err) => (err.status(), "Bad Request"),
            AppError::MultipartBody(rejection) => {
                tracing::debug!(%rejection, "rejected multipart body");
                (rejection.status(), "Bad Request")
            }
            AppError::FormBody(rejection) => {
                tracing::debug!(%rejection, "rejected form body");
                (rejection.status(), "Bad Request")
            }
            AppError::Db(_) | AppError::Template(_) | AppError::Io(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };
        (status, message).into_response()
    }
}
