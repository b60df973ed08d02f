//! Error type shared by every remote store call.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to the remote store.
///
/// [`ApiError::is_transient`] splits the variants into those worth retrying
/// (transport trouble, 5xx) and those that will fail the same way again
/// (4xx, unparseable bodies).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The store answered 404 for the requested resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store rejected the request (4xx other than 404).
    #[error("request rejected with HTTP {status}: {message}")]
    Client { status: u16, message: String },

    /// The store failed to handle the request (5xx).
    #[error("server error HTTP {status}")]
    Server { status: u16 },

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The request could not be built locally (e.g. an invalid MIME type).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Returns `true` for failures that may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Server { .. } | ApiError::Request(_) | ApiError::Timeout
        )
    }

    /// Map a non-success status to an error; `Ok(())` for 2xx/3xx.
    ///
    /// `what` names the resource for the `NotFound` message; `body` is the
    /// (possibly empty) response text kept for 4xx diagnostics.
    pub fn check_status(status: StatusCode, what: &str, body: &str) -> Result<(), ApiError> {
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(what.to_string()));
        }
        if status.is_client_error() {
            return Err(ApiError::Client {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }
        if status.is_server_error() {
            return Err(ApiError::Server {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Parse(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::check_status(status, "resource", "")
                .err()
                .unwrap_or_else(|| ApiError::Request(e.to_string()))
        } else {
            ApiError::Request(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Parse(e.to_string())
    }
}
