//! Error types for the Targetron pipeline.
//!
//! - [`CsvError`] - CSV loading and writing errors
//! - [`LayoutError`] - Contact layout configuration errors
//! - [`RegistryError`] - Layout registry errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP surface errors
//!
//! The core transforms (`expand`, `explode`) have no error type: they are
//! total over any well-formed [`crate::models::Table`].

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while loading or writing CSV data.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the byte stream.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// The stream could not be parsed as CSV at all.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// Failed to serialize a table back to CSV.
    #[error("Failed to write CSV: {0}")]
    WriteError(String),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(e: csv::Error) -> Self {
        CsvError::ParseError(e.to_string())
    }
}

// =============================================================================
// Layout Errors
// =============================================================================

/// Errors in a contact layout definition.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// An exclusion pattern is not a valid regex.
    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The layout document does not match the layout schema.
    #[error("Invalid layout: {}", .0.join("; "))]
    Schema(Vec<String>),

    /// The layout declares no contact groups.
    #[error("Layout '{0}' has no contact groups")]
    NoGroups(String),

    /// JSON serialization/deserialization error.
    #[error("Layout JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors from the layout registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Layout not found.
    #[error("Layout not found: {0}")]
    NotFound(String),

    /// Built-in layouts cannot be changed.
    #[error("Layout '{0}' is built in and cannot be modified")]
    ReadOnly(String),

    /// Stored or imported layout is invalid.
    #[error("Invalid layout: {0}")]
    InvalidLayout(#[from] LayoutError),

    /// IO error.
    #[error("Registry IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Registry JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_file`]
/// and friends. It wraps the lower-level errors so `?` works across them.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV loading or writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Layout configuration error.
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Registry error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// IO error outside CSV loading (layout files, output files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the error comes from the uploaded data rather than configuration.
    pub fn is_input_error(&self) -> bool {
        matches!(self, PipelineError::Csv(_))
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload exceeds the body limit.
    #[error("Upload too large: {0}")]
    TooLarge(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
