//! REST API types.
//!
//! A job response carries the full output CSV plus before/after previews so a
//! client can show both tables and offer the download without a second call.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::CsvError;
use crate::export::to_csv_string;
use crate::models::Table;
use crate::transform::pipeline::{PipelineResult, TransformKind, TransformStats};

/// Response sent after an upload was transformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready", "warning" (empty output), "error"
    pub status: String,

    /// Suggested download name
    pub file_name: String,

    /// Output table as CSV text
    pub csv: String,

    pub preview: TablePreview,

    pub metadata: JobMetadata,
}

/// First rows of the input and output tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    pub before: PreviewTable,
    pub after: PreviewTable,
}

/// A preview table: column order plus row records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewTable {
    pub columns: Vec<String>,
    pub rows: Vec<Value>,
}

impl From<&Table> for PreviewTable {
    fn from(table: &Table) -> Self {
        Self {
            columns: table.columns().to_vec(),
            rows: table.to_records(),
        }
    }
}

/// Metadata about the transformation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    pub transform: TransformKind,

    /// Layout used by an expand job
    pub layout_id: Option<String>,

    pub input_rows: usize,
    pub output_rows: usize,

    /// Repeated emails dropped (expand)
    pub duplicates: usize,

    /// Columns split (explode)
    pub exploded_columns: Vec<String>,

    pub csv_info: CsvMetadata,

    /// RFC 3339 UTC timestamp
    pub generated_at: String,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub skipped_rows: usize,
    pub columns: Vec<String>,
}

impl TryFrom<PipelineResult> for JobResponse {
    type Error = CsvError;

    fn try_from(result: PipelineResult) -> Result<Self, Self::Error> {
        let csv = to_csv_string(&result.output)?;
        let TransformStats {
            input_rows,
            output_rows,
            duplicates,
            exploded_columns,
            ..
        } = result.stats;

        Ok(JobResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if output_rows == 0 { "warning" } else { "ready" }.to_string(),
            file_name: result.file_name,
            csv,
            preview: TablePreview {
                before: PreviewTable::from(&result.before),
                after: PreviewTable::from(&result.after),
            },
            metadata: JobMetadata {
                transform: result.kind,
                layout_id: result.layout_id,
                input_rows,
                output_rows,
                duplicates,
                exploded_columns,
                csv_info: CsvMetadata {
                    encoding: result.csv_info.encoding,
                    delimiter: result.csv_info.delimiter.to_string(),
                    row_count: result.csv_info.row_count,
                    skipped_rows: result.csv_info.skipped_rows,
                    columns: result.csv_info.headers,
                },
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        })
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "fileName": null,
        "csv": "",
        "preview": {
            "before": { "columns": [], "rows": [] },
            "after": { "columns": [], "rows": [] }
        }
    })
}
