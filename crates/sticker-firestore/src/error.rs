//! Firestore error types.

use thiserror::Error;

/// Result type for Firestore operations.
pub type FirestoreResult<T> = Result<T, FirestoreError>;

/// Errors that can occur during Firestore operations.
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Rate limited: {message}")]
    RateLimited {
        retry_after_ms: Option<u64>,
        message: String,
    },

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::AuthError(message),
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(message),
            409 => Self::AlreadyExists(message),
            412 => Self::PreconditionFailed(message),
            429 => Self::RateLimited {
                retry_after_ms: None,
                message,
            },
            500..=599 => Self::ServerError { status, message },
            _ => Self::RequestFailed(message),
        }
    }

    /// Attach a Retry-After hint to a rate limit error.
    pub fn with_retry_after(self, retry_after_ms: Option<u64>) -> Self {
        match self {
            Self::RateLimited { message, .. } => Self::RateLimited {
                retry_after_ms,
                message,
            },
            other => other,
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(401),
            Self::PermissionDenied(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::AlreadyExists(_) => Some(409),
            Self::PreconditionFailed(_) => Some(412),
            Self::RateLimited { .. } => Some(429),
            Self::ServerError { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::RequestFailed(_) | Self::Json(_) => None,
        }
    }

    /// Server-requested delay before retrying.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::ServerError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert!(matches!(
            FirestoreError::from_http_status(404, "x"),
            FirestoreError::NotFound(_)
        ));
        assert!(matches!(
            FirestoreError::from_http_status(503, "x"),
            FirestoreError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            FirestoreError::from_http_status(400, "x"),
            FirestoreError::RequestFailed(_)
        ));
    }

    #[test]
    fn test_http_status_round_trip() {
        for status in [401u16, 403, 404, 409, 412, 429, 500, 503] {
            assert_eq!(
                FirestoreError::from_http_status(status, "x").http_status(),
                Some(status)
            );
        }
    }

    #[test]
    fn test_retryable() {
        assert!(FirestoreError::from_http_status(500, "x").is_retryable());
        assert!(FirestoreError::from_http_status(429, "x").is_retryable());
        assert!(!FirestoreError::from_http_status(403, "x").is_retryable());
        assert!(!FirestoreError::not_found("x").is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let err = FirestoreError::from_http_status(429, "slow").with_retry_after(Some(1500));
        assert_eq!(err.retry_after_ms(), Some(1500));
        let other = FirestoreError::from_http_status(500, "x").with_retry_after(Some(1500));
        assert_eq!(other.retry_after_ms(), None);
    }
}
