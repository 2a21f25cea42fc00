//! Background removal error types.

use thiserror::Error;

pub type RemovalResult<T> = Result<T, RemovalError>;

#[derive(Debug, Error)]
pub enum RemovalError {
    #[error("Background removal API key is not configured")]
    MissingApiKey,

    #[error("Background removal returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Background removal returned an empty image")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl RemovalError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            RemovalError::Status { status, .. } => *status == 429 || *status >= 500,
            RemovalError::Network(_) => true,
            RemovalError::MissingApiKey | RemovalError::EmptyResponse => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(RemovalError::status(503, "").is_retryable());
        assert!(RemovalError::status(429, "slow down").is_retryable());
        assert!(!RemovalError::status(402, "no credits").is_retryable());
        assert!(!RemovalError::MissingApiKey.is_retryable());
    }
}
