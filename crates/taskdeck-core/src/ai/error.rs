//! AI failure taxonomy
//!
//! Every failure coming out of the provider selector carries exactly one
//! [`AIErrorKind`]; the HTTP layer maps kinds to status codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of an AI failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AIErrorKind {
    /// Cloud engine selected without a usable credential (or the key was rejected)
    MissingKey,
    RateLimited,
    Timeout,
    /// The engine answered but the answer did not fit the expected shape
    InvalidResponse,
    NetworkError,
    /// Bad input: unknown engine/kind, empty text
    InvalidRequest,
    Unknown,
}

impl AIErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingKey => "missing-key",
            Self::RateLimited => "rate-limited",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid-response",
            Self::NetworkError => "network-error",
            Self::InvalidRequest => "invalid-request",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AIErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An AI failure with its kind and a human-readable message
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AIError {
    pub kind: AIErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type AIResult<T> = std::result::Result<T, AIError>;

impl AIError {
    pub fn new(kind: AIErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying error
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn missing_key() -> Self {
        Self::new(
            AIErrorKind::MissingKey,
            "An API key is required for the cloud engine",
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(AIErrorKind::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(AIErrorKind::InvalidResponse, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AIErrorKind::Timeout, message)
    }
}

impl From<reqwest::Error> for AIError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            AIErrorKind::Timeout
        } else if err.is_decode() {
            AIErrorKind::InvalidResponse
        } else {
            AIErrorKind::NetworkError
        };
        // Strip the URL: it carries the API key as a query parameter
        let err = err.without_url();
        Self::new(kind, err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(AIErrorKind::MissingKey.as_str(), "missing-key");
        assert_eq!(
            serde_json::to_string(&AIErrorKind::InvalidResponse).unwrap(),
            r#""invalid-response""#
        );
    }

    #[test]
    fn test_display_includes_kind() {
        let err = AIError::invalid_request("text is empty");
        assert_eq!(err.to_string(), "invalid-request: text is empty");
        assert!(std::error::Error::source(&err).is_none());
    }
}
