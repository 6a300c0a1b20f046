//! CSV loading with encoding and delimiter auto-detection.
//!
//! Parsing is lenient: rows with more fields than the header are skipped and
//! reported, short rows are padded with `null`, and empty fields load as
//! `null`. Duplicate header names get `.1`, `.2` suffixes so column names
//! stay unique.

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::Encoding;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::Table;

/// Delimiters considered by [`detect_delimiter`], in tie-break order.
const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// A data row the parser dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line where the record starts.
    pub line: u64,
    pub reason: String,
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub table: Table,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Malformed rows that were skipped
    pub skipped: Vec<SkippedRow>,
}

impl ParseResult {
    pub fn headers(&self) -> &[String] {
        self.table.columns()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" | "latin-9" | "latin9" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes using an encoding label (WHATWG labels, e.g. `utf-8`,
/// `iso-8859-1`, `windows-1252`).
///
/// A leading BOM is removed. Undecodable sequences are replaced rather than
/// failing the load.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let encoding = Encoding::for_label(encoding.trim().as_bytes())
        .ok_or_else(|| CsvError::EncodingError(format!("Unsupported encoding: {}", encoding)))?;
    let (content, _, _) = encoding.decode(bytes);
    Ok(content.into_owned())
}

/// Encodings a detected label is trusted for when the bytes are not UTF-8.
const LEGACY_ENCODINGS: [&str; 3] = ["iso-8859-1", "iso-8859-15", "windows-1252"];

/// Decode bytes of unknown encoding.
///
/// Valid UTF-8 (with or without BOM) is always read as UTF-8. Otherwise the
/// detected label is used for the Latin-1 and Windows-1252 families only;
/// anything else is read as lossy UTF-8. Returns the text and the encoding
/// actually used.
pub fn decode_auto(bytes: &[u8]) -> (String, String) {
    decode_with_fallback(bytes, &detect_encoding(bytes))
}

fn decode_with_fallback(bytes: &[u8], detected: &str) -> (String, String) {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return (text.to_string(), "utf-8".to_string());
    }

    if LEGACY_ENCODINGS.contains(&detected) {
        if let Ok(text) = decode_content(bytes, detected) {
            return (text, detected.to_string());
        }
    }

    (String::from_utf8_lossy(body).into_owned(), "utf-8".to_string())
}

/// Detect the delimiter from the header line.
///
/// Counts candidate characters outside quoted sections; falls back to `,`.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");

    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for c in first_line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            if let Some(i) = DELIMITER_CANDIDATES.iter().position(|&d| d == c) {
                counts[i] += 1;
            }
        }
    }

    let mut best = DELIMITER_CANDIDATES[0];
    let mut best_count = 0;
    for (i, &sep) in DELIMITER_CANDIDATES.iter().enumerate() {
        if counts[i] > best_count {
            best_count = counts[i];
            best = sep;
        }
    }
    best
}

/// Parse CSV from a reader into a [`Table`], collecting skipped rows.
pub fn parse_reader<R: Read>(reader: R, delimiter: char) -> CsvResult<(Table, Vec<SkippedRow>)> {
    if !delimiter.is_ascii() {
        return Err(CsvError::ParseError(format!(
            "Delimiter must be an ASCII character, got '{}'",
            delimiter
        )));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header_record = reader.headers()?.clone();
    if header_record.is_empty() {
        return Err(CsvError::NoHeaders);
    }
    let headers = unique_headers(&header_record);
    let width = headers.len();

    let mut table = Table::new(headers);
    let mut skipped = Vec::new();

    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    return Err(e.into());
                }
                skipped.push(SkippedRow {
                    line: e.position().map(|p| p.line()).unwrap_or(0),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if record.len() > width {
            skipped.push(SkippedRow {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                reason: format!("Expected {} fields, found {}", width, record.len()),
            });
            continue;
        }

        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::String(field.to_string())
                }
            })
            .collect();
        table.push_row(cells);
    }

    Ok((table, skipped))
}

/// Trimmed header names, blanks named `Unnamed: <i>`, duplicates suffixed.
fn unique_headers(record: &StringRecord) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(record.len());

    for (i, raw) in record.iter().enumerate() {
        let base = match raw.trim() {
            "" => format!("Unnamed: {}", i),
            name => name.to_string(),
        };

        let mut name = base.clone();
        let mut n = 0;
        while used.contains(&name) {
            n += 1;
            name = format!("{}.{}", base, n);
        }
        used.insert(name.clone());
        headers.push(name);
    }

    headers
}

/// Parse decoded CSV text with an explicit delimiter.
pub fn parse_string_with_metadata(content: &str, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let (table, skipped) = parse_reader(content.as_bytes(), delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
        skipped,
    })
}

/// Parse UTF-8 CSV text with an explicit delimiter.
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<ParseResult> {
    parse_string_with_metadata(content, delimiter, "utf-8".to_string())
}

/// Parse CSV into JSON objects, one per row.
///
/// # Example
/// ```ignore
/// use targetron::csv_to_json;
///
/// let rows = csv_to_json("name;age\nAlice;30", ';').unwrap();
/// assert_eq!(rows[0]["name"], "Alice");
/// ```
pub fn csv_to_json(csv: &str, delimiter: char) -> CsvResult<Vec<Value>> {
    parse_str(csv, delimiter).map(|r| r.table.to_records())
}

/// Parse CSV bytes, auto-detecting the encoding and, unless given, the delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let (content, encoding) = decode_auto(bytes);

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    parse_bytes(bytes, None)
}

/// Parse a CSV file, auto-detecting the encoding and, unless given, the delimiter.
pub fn parse_csv_file<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, delimiter)
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    parse_csv_file(path, None)
}
