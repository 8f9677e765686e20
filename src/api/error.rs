use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::core::BenchError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// API errors with HTTP status code mapping.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    Internal(String),
}

impl From<BenchError> for ApiError {
    fn from(err: BenchError) -> Self {
        match &err {
            BenchError::InvalidRequest(_)
            | BenchError::UnknownWorkload(_)
            | BenchError::UnknownQuery { .. } => ApiError::InvalidRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BenchError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (BenchError::UnknownWorkload("x".into()), StatusCode::BAD_REQUEST),
            (BenchError::ReportError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (BenchError::Connection("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
        assert_eq!(
            ApiError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
