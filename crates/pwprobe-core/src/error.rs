//! Error types for pwprobe

use thiserror::Error;

/// Errors raised while turning a connection string back into a config
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStringError {
    #[error("connection string is empty")]
    Empty,

    #[error("connection string has no host component")]
    MissingHost,

    #[error("invalid port '{0}': expected a number between 1 and 65535")]
    InvalidPort(String),

    #[error("malformed key/value pair '{0}': expected key=value")]
    MalformedPair(String),

    #[error("invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid percent-encoding in {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },
}

/// Core error type for pwprobe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Connection string error: {0}")]
    ConnectionString(#[from] ConnectionStringError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Services unavailable: {0}")]
    ServicesUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for pwprobe operations
pub type Result<T> = std::result::Result<T, ProbeError>;
