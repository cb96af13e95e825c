//! Error types for the REST API server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::report::ReportError;
use crate::store::StoreError;

/// API error types
///
/// The three request outcomes stay distinct all the way to the wire: a
/// report, a not-found signal, and a failure signal. An empty group is not
/// an error and never reaches this type.
#[derive(Debug)]
pub enum ApiError {
    /// Industry name unresolvable, even case-insensitively
    IndustryNotFound(String),
    /// The store is unreachable or the pool timed out
    StoreUnavailable(String),
    /// Any other internal fault
    InternalError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::IndustryNotFound(name) => write!(f, "Industry not found: {}", name),
            ApiError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::IndustryNotFound(name) => (
                StatusCode::NOT_FOUND,
                "IndustryNotFound",
                format!("Industry '{}' not found", name),
            ),
            ApiError::StoreUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "StoreUnavailable",
                msg.clone(),
            ),
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                msg.clone(),
            ),
        };

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

// Conversions from other error types

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::GroupNotFound(name) => ApiError::IndustryNotFound(name),
            ReportError::Store(store_err) => store_err.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ApiError::StoreUnavailable(msg),
            StoreError::Malformed(msg) => ApiError::InternalError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_never_conflated_with_failure() {
        let not_found: ApiError =
            ReportError::GroupNotFound("Zyzzyx".to_string()).into();
        assert!(matches!(not_found, ApiError::IndustryNotFound(_)));

        let failure: ApiError =
            ReportError::Store(StoreError::Unavailable("down".to_string())).into();
        assert!(matches!(failure, ApiError::StoreUnavailable(_)));

        let malformed: ApiError =
            ReportError::Store(StoreError::Malformed("bad row".to_string())).into();
        assert!(matches!(malformed, ApiError::InternalError(_)));
    }
}
