//! Error types for the harvest pipeline

use thiserror::Error;

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for harvest operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by libgit2
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Malformed CSV input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory walk error
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid repository source table
    #[error("Source table error: {0}")]
    Source(String),

    /// Clone or checkout failure for one repository
    #[error("Clone error: {0}")]
    Clone(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
