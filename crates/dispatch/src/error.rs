//! Error types for outbound call placement.

use thiserror::Error;

/// Errors that can occur while placing a single call.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Provider answered with a non-success status
    #[error("provider rejected call ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Request never produced a usable response
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Success status but the body did not carry a call id
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    /// Client could not be constructed
    #[error("invalid dispatch configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
