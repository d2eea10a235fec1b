//! Error types for the AT Protocol client

use std::fmt;

/// Errors surfaced by identity resolution, sessions, and record operations
#[derive(Debug)]
pub enum ClientError {
    /// Handle or DID could not be resolved, unsupported DID method,
    /// or the DID document names no hosting endpoint
    Identity(String),
    /// Bad credentials, or an expired session that could not be refreshed
    Auth(String),
    /// Terminal non-2xx response after the retry policy is exhausted
    Http(u16),
    /// Malformed URI or missing required input
    Validation(String),
    /// Transport-level request failure
    Network(reqwest::Error),
    /// Response body was not the expected JSON shape
    Json(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(msg) => write!(f, "identity error: {}", msg),
            Self::Auth(msg) => write!(f, "auth error: {}", msg),
            Self::Http(status) => write!(f, "HTTP {}", status),
            Self::Validation(msg) => write!(f, "validation error: {}", msg),
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Json(e) => write!(f, "JSON parse error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<at_uri::AtUriError> for ClientError {
    fn from(e: at_uri::AtUriError) -> Self {
        Self::Validation(e.to_string())
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
