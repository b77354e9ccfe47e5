//! Provider error type

use thiserror::Error;

/// Failure reported by an auth or storage provider.
///
/// Carries only the human-readable message; callers map a few known
/// messages to friendlier text and surface the rest as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}
