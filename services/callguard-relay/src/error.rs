//! Request-level errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors that reject a whole request before any call is placed.
///
/// Per-destination dispatch failures are not here; they are reported
/// inside the relay response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Malformed request body
    #[error("{0}")]
    Validation(String),

    /// No usable credential supplied
    #[error("Unauthorized")]
    Unauthorized,

    /// Bearer token present but failed verification
    #[error("Invalid token")]
    InvalidToken,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized | RelayError::InvalidToken => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
