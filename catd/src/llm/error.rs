//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the model runtime
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Check if another attempt against the same model could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Upstream { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        // 5xx errors should be retryable
        assert!(
            LlmError::Upstream {
                status: 500,
                message: "Server error".to_string()
            }
            .is_retryable()
        );

        assert!(
            LlmError::Upstream {
                status: 503,
                message: "Unavailable".to_string()
            }
            .is_retryable()
        );

        // 4xx errors should not be retryable
        assert!(
            !LlmError::Upstream {
                status: 404,
                message: "Model not found".to_string()
            }
            .is_retryable()
        );

        // Timeout should be retryable
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());

        // Invalid response should not be retryable
        assert!(!LlmError::InvalidResponse("Bad JSON".to_string()).is_retryable());
    }
}
