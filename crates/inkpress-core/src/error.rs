//! Error types for the blog content engine.
//!
//! All errors in the system are represented by the [`Error`] enum.
//! This ensures composable error handling across crates.

use std::io;
use thiserror::Error as ThisError;

/// The core error type for all content operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed structured data (frontmatter, diagram JSON, config files)
    #[error("Parse error: {reason}")]
    ParseError { reason: String },

    /// Requested post is absent from every resolved source
    #[error("Post not found: {slug}")]
    NotFound { slug: String },

    /// Remote content host failure
    #[error("Network error: {reason}")]
    Network { reason: String },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    /// Session storage failure (cache reads/writes)
    #[error("Storage error: {reason}")]
    StorageError { reason: String },

    /// Generic unclassified error
    #[error("Error: {0}")]
    Other(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error
    pub fn io(err: io::Error) -> Self {
        Error::Io(err)
    }

    /// Create a parse error
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Error::ParseError {
            reason: reason.into(),
        }
    }

    /// Create a not found error for a slug
    pub fn not_found(slug: impl Into<String>) -> Self {
        Error::NotFound { slug: slug.into() }
    }

    /// Create a network error
    pub fn network(reason: impl Into<String>) -> Self {
        Error::Network {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a storage error
    pub fn storage_error(reason: impl Into<String>) -> Self {
        Error::StorageError {
            reason: reason.into(),
        }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error means the requested post does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Human-readable message without the variant prefix, for inline error panels
    pub fn message(&self) -> String {
        match self {
            Error::ParseError { reason }
            | Error::Network { reason }
            | Error::ConfigError { reason }
            | Error::StorageError { reason } => reason.clone(),
            Error::NotFound { slug } => format!("No post with slug '{}'", slug),
            Error::Io(e) => e.to_string(),
            Error::Other(msg) => msg.clone(),
        }
    }
}
