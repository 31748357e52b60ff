//! Client error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by the control-plane client
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP transport error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx API response
    #[error("server error ({status}): {body}")]
    Server { status: u16, body: String },
}
