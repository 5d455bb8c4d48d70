//! Error types for hrmap-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hrmap-core
#[derive(Debug, Error)]
pub enum Error {
    /// A required structural element of the input is missing
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or write a file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse CSV
    #[error("failed to parse CSV '{path}': {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// CSV writer error
    #[error("failed to write CSV: {0}")]
    CsvWrite(#[from] csv::Error),

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors caused by the shape of the input tables rather than I/O
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Fatal configuration problems. Each names the element that could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No table carries the mapping-configuration signature
    #[error("no mapping configuration table found (expected 'Target Column'/'Target Field' and 'Source Table' columns, or a sheet named MAPPING)")]
    MissingMappingTable,

    /// No table matches the primary-entity naming pattern
    #[error("no primary entity table found (expected a personal data table such as 'PA0002')")]
    MissingPrimaryTable,

    /// A required column could not be located by name
    #[error("table '{table}' is missing required column '{element}'")]
    MissingColumn { table: String, element: String },

    /// The primary table has no recognizable entity id column
    #[error("table '{table}' has no entity id column (looked for {aliases})")]
    MissingIdColumn { table: String, aliases: String },
}
