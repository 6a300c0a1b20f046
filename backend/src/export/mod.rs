//! CSV export of transformed tables.
//!
//! Output is always comma-delimited with a header row and no index column.
//! `null` cells are written as empty fields.

use csv::WriterBuilder;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::Table;
use crate::transform::columns::cell_text;

/// Prefix used when none is supplied.
pub const DEFAULT_FILE_PREFIX: &str = "targetron";

/// Serialize a table to CSV bytes.
pub fn to_csv_bytes(table: &Table) -> CsvResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(table.columns())
        .map_err(|e| CsvError::WriteError(e.to_string()))?;

    for row in table.raw_rows() {
        writer
            .write_record(row.iter().map(|cell| cell_text(cell).into_owned()))
            .map_err(|e| CsvError::WriteError(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| CsvError::WriteError(e.to_string()))
}

/// Serialize a table to a CSV string.
pub fn to_csv_string(table: &Table) -> CsvResult<String> {
    let bytes = to_csv_bytes(table)?;
    String::from_utf8(bytes).map_err(|e| CsvError::WriteError(e.to_string()))
}

/// Write a table to a CSV file.
pub fn write_csv_file<P: AsRef<Path>>(table: &Table, path: P) -> CsvResult<()> {
    let bytes = to_csv_bytes(table)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Download file name: `<prefix>_exploded.csv`.
///
/// The prefix is reduced to ASCII letters, digits, `-` and `_`; an empty
/// result falls back to [`DEFAULT_FILE_PREFIX`].
pub fn output_file_name(prefix: &str) -> String {
    let clean: String = prefix
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let clean = clean.trim_matches('_');

    if clean.is_empty() {
        format!("{}_exploded.csv", DEFAULT_FILE_PREFIX)
    } else {
        format!("{}_exploded.csv", clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_header_and_rows() {
        let table = Table::from_strings(["name", "city"], [vec!["Ann", "Paris"], vec!["Bo", "Oslo"]]);
        let csv = to_csv_string(&table).unwrap();
        assert_eq!(csv, "name,city\nAnn,Paris\nBo,Oslo\n");
    }

    #[test]
    fn test_null_written_as_empty_and_types_as_text() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![Value::Null, json!(3), json!(false)]],
        );
        assert_eq!(to_csv_string(&table).unwrap(), "a,b,c\n,3,false\n");
    }

    #[test]
    fn test_fields_with_commas_quoted() {
        let table = Table::from_strings(["v"], [vec!["x,y"], vec!["say \"hi\""]]);
        assert_eq!(to_csv_string(&table).unwrap(), "v\n\"x,y\"\n\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_header_only_table() {
        let table = Table::new(vec!["email".into()]);
        assert_eq!(to_csv_string(&table).unwrap(), "email\n");
    }

    #[test]
    fn test_round_trip_through_parser() {
        let table = Table::from_strings(["email", "tags"], [vec!["a@x.com", "x, y"]]);
        let csv = to_csv_string(&table).unwrap();
        let parsed = crate::parser::parse_str(&csv, ',').unwrap();
        assert_eq!(parsed.table, table);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(output_file_name("leads"));
        let table = Table::from_strings(["a"], [vec!["1"]]);

        write_csv_file(&table, &path).unwrap();

        assert!(path.ends_with("leads_exploded.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("targetron"), "targetron_exploded.csv");
        assert_eq!(output_file_name("my leads.csv"), "my_leads_csv_exploded.csv");
        assert_eq!(output_file_name("  "), "targetron_exploded.csv");
        assert_eq!(output_file_name("../etc"), "etc_exploded.csv");
    }
}
