//! Error types for the Rivet client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Rivet client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The request was rejected because the stored version moved
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a save conflict (the base version moved)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_)) || matches!(self, Self::ApiError { status: 409, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
            || matches!(self, Self::InvalidRequest(_))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }

    /// Check if retrying the same request may succeed
    ///
    /// Transport failures and server errors are transient; 4xx responses and
    /// unparseable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) => true,
            Self::ApiError { status, .. } => *status >= 500 || matches!(status, 408 | 429),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ClientError::api_error(404, "missing").is_not_found());
        assert!(ClientError::NotFound("p1".to_string()).is_not_found());
        assert!(ClientError::api_error(409, "moved").is_conflict());
        assert!(ClientError::api_error(409, "moved").is_client_error());
        assert!(ClientError::api_error(503, "down").is_server_error());
        assert!(ClientError::api_error(503, "down").is_transient());
        assert!(ClientError::api_error(429, "slow down").is_transient());
        assert!(!ClientError::api_error(400, "bad").is_transient());
        assert!(!ClientError::ParseError("eof".to_string()).is_transient());
    }
}
