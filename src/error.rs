//! Error types for fsinstall
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while installing
#[derive(Debug, Error)]
pub enum InstallError {
    /// Download of the source artifact failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The packaging tool failed or produced no executable
    #[error("Build error: {0}")]
    Build(String),

    /// One or more install destinations could not be written
    #[error("Deploy error: {0}")]
    Deploy(String),

    /// Removing build byproducts failed
    #[error("Clean error: {0}")]
    Clean(String),

    /// Install destinations are not writable by the current user
    #[error("Privilege error: {0}")]
    Privilege(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for fsinstall operations
pub type Result<T> = std::result::Result<T, InstallError>;
