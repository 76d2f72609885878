/*
[INPUT]:  Error sources (HTTP, API, serialization, auth, WebSocket, row validation)
[OUTPUT]: Structured error type shared by every backend client
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Main error type for the hosted backend adapter
#[derive(Error, Debug)]
pub enum BackendError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (code {code}): {message}")]
    Api { code: u16, message: String },

    /// Credentials rejected or session no longer valid
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Operation needs a session but none is held
    #[error("Not signed in")]
    NotSignedIn,

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A row did not have the expected shape
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local filesystem error (session file, attachments)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        match self {
            BackendError::Authentication { .. } | BackendError::NotSignedIn => true,
            BackendError::Api { code, .. } => *code == 401 || *code == 403,
            _ => false,
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        BackendError::Api {
            code: status.as_u16(),
            message: message.into(),
        }
    }

    /// Build an error from a non-success response body.
    ///
    /// Auth, rest and storage each report failures with a different key, so
    /// every known one is tried before falling back to the raw body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body.trim().to_string()
                }
            });

        if status == StatusCode::UNAUTHORIZED {
            BackendError::Authentication { message }
        } else {
            BackendError::api_error(status, message)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;
