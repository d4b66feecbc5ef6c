// src/error.rs

//! Unified error handling for the tracker.

use std::fmt;

use thiserror::Error;

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Final response carried an unexpected status
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Every retry attempt came back with a non-success status
    #[error("Giving up on {url} after {attempts} attempts (last status {status})")]
    RetriesExhausted {
        url: String,
        status: u16,
        attempts: u32,
    },

    /// Work was abandoned through the cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regular expression failed to compile
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Syndication feed could not be parsed
    #[error("Feed error: {0}")]
    Feed(String),

    /// A field value is malformed
    #[error("Bad {field}: {message}")]
    DataIntegrity { field: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage backend error (S3 requests)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A requested object does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Create a data integrity error for a named field.
    pub fn data_integrity(field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::DataIntegrity {
            field: field.into(),
            message: message.to_string(),
        }
    }
}
