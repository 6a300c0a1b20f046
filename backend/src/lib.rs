//! # Targetron - reshape wide contact CSV exports
//!
//! Targetron turns lead-list exports that carry several contacts per row
//! (`email_1`, `email_2`, ...) into one row per contact, and splits
//! comma-separated cells into one row per value.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│    Transform     │────▶│  CSV File   │
//! │  (any enc)  │     │ (auto-enc)  │     │ expand | explode │     │ <prefix>_…  │
//! └─────────────┘     └─────────────┘     └──────────────────┘     └─────────────┘
//!                                                  ▲
//!                                         ContactLayout (registry)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use targetron::{run_file, TransformKind, TransformOptions};
//!
//! let result = run_file("leads.csv".as_ref(), TransformKind::Expand, &TransformOptions::default())?;
//! targetron::write_csv_file(&result.output, &result.file_name)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - The in-memory [`Table`]
//! - [`parser`] - CSV loading with auto-detection
//! - [`export`] - CSV writing
//! - [`transform`] - Expand, explode, layouts and the pipeline
//! - [`validation`] - Layout schema validation
//! - [`cache`] - Layout registry
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Input / output
pub mod export;
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Layout registry
pub mod cache;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CsvError, LayoutError, PipelineError, RegistryError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Row, Table};

// =============================================================================
// Re-exports - CSV
// =============================================================================

pub use parser::{
    csv_to_json,
    decode_auto,
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes,
    parse_bytes_auto,
    parse_csv_file,
    parse_csv_file_auto,
    parse_str,
    ParseResult,
    SkippedRow,
};

pub use export::{output_file_name, to_csv_bytes, to_csv_string, write_csv_file};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use transform::{
    builtin_layouts,
    cell_text,
    default_layout,
    expand,
    explode,
    explode_with,
    numbered_layout,
    ContactGroup,
    ContactLayout,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid_layout, validate_layout};

// =============================================================================
// Re-exports - Registry (Cache)
// =============================================================================

pub use cache::{LayoutRegistry, StoredLayout};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    run_bytes,
    run_file,
    run_table,
    CsvInfo,
    PipelineResult,
    TransformKind,
    TransformOptions,
    TransformStats,
};

// Kept at the crate root for `targetron::pipeline::...` paths.
pub use transform::pipeline;

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, CsvMetadata, JobMetadata, JobResponse, PreviewTable, TablePreview};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
