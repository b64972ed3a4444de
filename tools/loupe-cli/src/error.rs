//! Error types for the CLI.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific result type.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
pub enum CliError {
    /// No catalog specified.
    #[error("no catalog specified. Use --database or set LOUPE_DB environment variable")]
    NoDatabaseSpecified,

    /// Neither a configuration file nor a dimension was given.
    #[error("no dimension specified. Use --dimension or --config")]
    NoDimension,

    /// Catalog error.
    #[error("catalog error: {0}")]
    Catalog(#[from] loupe::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File not found.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// Parse error.
    #[error("parse error: {0}")]
    Parse(String),
}
