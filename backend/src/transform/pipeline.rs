//! High-level pipeline API: load a CSV, run one transform, report.
//!
//! ```text
//!   bytes / file ──► parser ──► Table ──┬─► expand (ContactLayout) ──┐
//!                                       └─► explode (split_on) ──────┴─► PipelineResult
//! ```
//!
//! Every step is reported through the log broadcaster so both the CLI
//! (stderr) and SSE clients can follow progress.
//!
//! # Example
//!
//! ```rust,ignore
//! use targetron::pipeline::{run_file, TransformKind, TransformOptions};
//! use std::path::Path;
//!
//! let result = run_file(Path::new("leads.csv"), TransformKind::Expand, &TransformOptions::default())?;
//! println!("{} contacts", result.output.len());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::explode::{explode_detailed, DEFAULT_DELIMITER};
use super::layout::ContactLayout;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::cache::LayoutRegistry;
use crate::error::{PipelineError, RegistryError};
use crate::export::{output_file_name, DEFAULT_FILE_PREFIX};
use crate::models::Table;
use crate::parser::{parse_bytes, parse_csv_file, ParseResult};

/// Rows shown in before/after previews.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Which transform a run applies. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Wide contact groups to one row per contact.
    Expand,
    /// Split delimited cells into rows.
    Explode,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Expand => "expand",
            TransformKind::Explode => "explode",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for the transformation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Registry id of the layout to expand with
    pub layout_id: Option<String>,

    /// Layout JSON file, takes precedence over `layout_id`
    pub layout_path: Option<String>,

    /// Input CSV delimiter; auto-detected when `None`
    pub input_delimiter: Option<char>,

    /// Delimiter that explode splits cells on
    pub split_on: char,

    /// Number of rows kept in the before/after previews
    pub preview_rows: usize,

    /// Prefix of the output file name
    pub file_prefix: String,

    /// Layout registry directory; see [`LayoutRegistry::new`] when `None`
    pub registry_dir: Option<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            layout_id: None,
            layout_path: None,
            input_delimiter: None,
            split_on: DEFAULT_DELIMITER,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            registry_dir: None,
        }
    }
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
    /// Malformed rows dropped while loading
    pub skipped_rows: usize,
}

/// Counters describing what a run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStats {
    pub input_rows: usize,
    pub output_rows: usize,
    /// Contacts found before deduplication (expand only)
    pub emitted: usize,
    /// Contacts dropped as repeated emails (expand only)
    pub duplicates: usize,
    /// Columns that were split (explode only)
    pub exploded_columns: Vec<String>,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub kind: TransformKind,

    /// The transformed table
    pub output: Table,

    /// First rows of the input
    pub before: Table,

    /// First rows of the output
    pub after: Table,

    /// CSV parsing metadata
    pub csv_info: CsvInfo,

    pub stats: TransformStats,

    /// Layout used by an expand run
    pub layout_id: Option<String>,

    /// Download name for the output
    pub file_name: String,
}

/// Load a CSV file and apply `kind` to it.
pub fn run_file(path: &Path, kind: TransformKind, options: &TransformOptions) -> Result<PipelineResult, PipelineError> {
    log_info(format!("📖 Reading {}...", path.display()));
    let parse_result = parse_csv_file(path, options.input_delimiter)?;
    run_parsed(parse_result, kind, options)
}

/// Same as [`run_file`] but accepts raw bytes (an upload).
pub fn run_bytes(bytes: &[u8], kind: TransformKind, options: &TransformOptions) -> Result<PipelineResult, PipelineError> {
    log_info(format!("📖 Reading uploaded CSV ({} bytes)...", bytes.len()));
    let parse_result = parse_bytes(bytes, options.input_delimiter)?;
    run_parsed(parse_result, kind, options)
}

/// Apply `kind` to an already loaded table.
pub fn run_table(table: Table, kind: TransformKind, options: &TransformOptions) -> Result<PipelineResult, PipelineError> {
    let parse_result = ParseResult {
        table,
        encoding: "utf-8".to_string(),
        delimiter: options.input_delimiter.unwrap_or(','),
        skipped: Vec::new(),
    };
    run_parsed(parse_result, kind, options)
}

fn run_parsed(parse_result: ParseResult, kind: TransformKind, options: &TransformOptions) -> Result<PipelineResult, PipelineError> {
    log_success(format!("Encoding: {}", parse_result.encoding));
    log_success(format!("Separator: '{}'", format_delimiter(parse_result.delimiter)));
    log_success(format!("Read {} rows", parse_result.table.len()));
    report_skipped(&parse_result);

    let csv_info = CsvInfo {
        encoding: parse_result.encoding.clone(),
        delimiter: parse_result.delimiter,
        headers: parse_result.headers().to_vec(),
        row_count: parse_result.table.len(),
        skipped_rows: parse_result.skipped.len(),
    };

    let table = parse_result.table;
    log_info(format!("📋 CSV has {} columns:", table.width()));
    for (i, col) in table.columns().iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    let before = table.head(options.preview_rows);
    let (output, stats, layout_id) = match kind {
        TransformKind::Expand => {
            let (id, output, stats) = run_expand(&table, options)?;
            (output, stats, Some(id))
        }
        TransformKind::Explode => {
            let (output, stats) = run_explode(&table, options.split_on);
            (output, stats, None)
        }
    };
    let after = output.head(options.preview_rows);

    Ok(PipelineResult {
        kind,
        output,
        before,
        after,
        csv_info,
        stats,
        layout_id,
        file_name: output_file_name(&options.file_prefix),
    })
}

fn run_expand(table: &Table, options: &TransformOptions) -> Result<(String, Table, TransformStats), PipelineError> {
    let mut registry = open_registry(options);
    let (layout_id, layout, from_registry) = resolve_layout(table.columns(), options, &registry)?;

    if let Err(missing) = layout.validate_headers(table.columns()) {
        log_warning(format!(
            "{} layout column(s) missing, read as empty: {}",
            missing.len(),
            missing.join(", ")
        ));
    }

    log_info("⚙️  Expanding contacts...");
    let outcome = layout.expand(table)?;
    log_info_indent(format!("Base columns: {}", outcome.base_columns.join(", ")), 1);
    log_success(format!("{} contacts found", outcome.emitted));
    if outcome.duplicates > 0 {
        log_warning(format!("{} duplicate emails dropped", outcome.duplicates));
    }
    log_success(format!("{} rows → {} contacts", table.len(), outcome.table.len()));

    if from_registry {
        if let Err(e) = registry.record_use(&layout_id) {
            log_warning(format!("Could not update layout usage: {}", e));
        }
    }

    let stats = TransformStats {
        input_rows: table.len(),
        output_rows: outcome.table.len(),
        emitted: outcome.emitted,
        duplicates: outcome.duplicates,
        exploded_columns: Vec::new(),
    };
    Ok((layout_id, outcome.table, stats))
}

fn run_explode(table: &Table, split_on: char) -> (Table, TransformStats) {
    log_info(format!("⚙️  Exploding cells on '{}'...", format_delimiter(split_on)));
    let outcome = explode_detailed(table, split_on);

    if outcome.exploded_columns.is_empty() {
        log_warning("No column contains the delimiter, table unchanged");
    } else {
        log_info(format!("Exploded {} column(s):", outcome.exploded_columns.len()));
        for col in &outcome.exploded_columns {
            log_info_indent(col.clone(), 1);
        }
    }
    log_success(format!("{} rows → {} rows", table.len(), outcome.table.len()));

    let stats = TransformStats {
        input_rows: table.len(),
        output_rows: outcome.table.len(),
        emitted: 0,
        duplicates: 0,
        exploded_columns: outcome.exploded_columns,
    };
    (outcome.table, stats)
}

fn open_registry(options: &TransformOptions) -> LayoutRegistry {
    match options.registry_dir {
        Some(ref dir) => LayoutRegistry::with_dir(dir),
        None => LayoutRegistry::new(),
    }
}

/// Pick the expand layout: explicit file, then registry id, then the best
/// header match (which falls back to the default layout).
///
/// The flag tells whether the layout came from the registry.
fn resolve_layout(
    headers: &[String],
    options: &TransformOptions,
    registry: &LayoutRegistry,
) -> Result<(String, ContactLayout, bool), PipelineError> {
    if let Some(ref path) = options.layout_path {
        log_info(format!("Using layout file: {}", path));
        let content = std::fs::read_to_string(path)?;
        let layout = ContactLayout::from_json(&content)?;
        return Ok((layout.name.clone(), layout, false));
    }

    if let Some(ref id) = options.layout_id {
        let stored = registry
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        log_info(format!("Using layout: {}", stored.name));
        return Ok((stored.id.clone(), stored.layout.clone(), true));
    }

    log_info("🔍 Looking for a matching layout...");
    let compatible = registry.find_compatible(headers);
    if compatible.is_empty() {
        log_warning("No layout matches these headers, using the default");
    } else {
        for (stored, score) in compatible.iter().take(3) {
            log_info_indent(format!("{} ({:.0}%)", stored.id, score * 100.0), 1);
        }
    }
    let (id, layout) = registry.best_match(headers);
    log_success(format!("Layout: {}", id));
    Ok((id, layout, true))
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        ' ' => "SPACE".to_string(),
        other => other.to_string(),
    }
}

fn report_skipped(parse_result: &ParseResult) {
    if parse_result.skipped.is_empty() {
        return;
    }
    log_warning(format!("{} malformed rows skipped", parse_result.skipped.len()));
    for row in parse_result.skipped.iter().take(5) {
        log_warning(format!("• line {}: {}", row.line, row.reason));
    }
    if parse_result.skipped.len() > 5 {
        log_warning(format!("... +{}", parse_result.skipped.len() - 5));
    }
}
