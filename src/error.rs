//! Error types shared by the HTTP client and the app.

use thiserror::Error;

/// Errors talking to the typing server
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Connection, timeout or body read failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("server responded with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The JSON envelope carried a non-success status
    #[error("server reported an error: {0}")]
    Server(String),

    /// The body was not the JSON we expected
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured server address can't be used as a base URL
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    /// The background worker is gone
    #[error("api worker disconnected")]
    Disconnected,
}

impl ApiError {
    /// The server understood the request and said no.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Server(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
