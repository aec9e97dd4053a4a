//! Error types for the Leadflow system

use std::fmt;
use thiserror::Error;

/// Which heuristic flagged a piece of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    Sql,
    Code,
}

impl fmt::Display for InjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionKind::Sql => f.write_str("SQL injection pattern"),
            InjectionKind::Code => f.write_str("code injection pattern"),
        }
    }
}

/// Main error type for all Leadflow operations
#[derive(Error, Debug)]
pub enum LeadflowError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid input in {field}: potential {kind} detected")]
    InjectionDetected { field: String, kind: InjectionKind },

    #[error("{service} returned {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for LeadflowError {
    fn from(err: ::config::ConfigError) -> Self {
        LeadflowError::Config(err.to_string())
    }
}

/// Result type for Leadflow operations
pub type Result<T> = std::result::Result<T, LeadflowError>;
