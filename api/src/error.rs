//! Error types for the catalog API client

use thiserror::Error;

/// Errors that can occur when interacting with the catalog API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server refused the request (validation failed server-side)
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// API returned another error status
    #[error("API error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },
}

/// Errors raised while loading the API configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is present but cannot be parsed
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable name
        key: String,
        /// Offending value
        value: String,
    },

    /// A URL does not use http or https
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
