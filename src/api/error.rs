use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

pub const INVALID_QUERY: &str = "Invalid query";

/// Failures surfaced by the HTTP handlers.
///
/// Every variant renders as `{"error": "<message>"}`. Internal errors are
/// logged server side and reported without detail.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    NotFound,
    EmailNotConfigured,
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!("rejected query string: {rejection}");
        Self::BadRequest(INVALID_QUERY)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            Self::EmailNotConfigured => (StatusCode::INTERNAL_SERVER_ERROR, "Email not configured"),
            Self::Internal(err) => {
                error!("Server error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
