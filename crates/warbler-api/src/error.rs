use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::flash;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid session, or a resource the session doesn't own.
    #[error("access unauthorized")]
    Unauthorized,
    /// Rejected by the CSRF guard.
    #[error("request forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => flash::unauthorized_redirect(),
            ApiError::Forbidden => StatusCode::FORBIDDEN.into_response(),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::Internal(err) => {
                error!("internal error: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
