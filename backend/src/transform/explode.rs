//! Explode comma-separated cells into rows.
//!
//! Every column holding the delimiter in at least one cell is split, and each
//! row is replaced by one row per piece. Columns are processed left to right
//! over the accumulated result, so explosions compound:
//!
//! ```text
//! ┌───────┬──────┐          ┌──────┬──────┐
//! │ a     │ b    │          │ a    │ b    │
//! ├───────┼──────┤    →     ├──────┼──────┤
//! │ x,y   │ 1,2  │          │ x    │ 1    │
//! └───────┴──────┘          │ x    │ 2    │
//!                           │ y    │ 1    │
//!                           │ y    │ 2    │
//!                           └──────┴──────┘
//! ```

use serde_json::Value;

use super::columns::{cell_text, column_contains};
use crate::models::Table;

/// Delimiter used by [`explode`].
pub const DEFAULT_DELIMITER: char = ',';

/// Result of an explode with the columns that were split.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplodeOutcome {
    pub table: Table,
    /// Names of the columns that contained the delimiter, in column order.
    pub exploded_columns: Vec<String>,
}

/// Explode every comma-bearing column of `input`.
pub fn explode(input: &Table) -> Table {
    explode_with(input, DEFAULT_DELIMITER)
}

/// Explode every column containing `delimiter`.
pub fn explode_with(input: &Table, delimiter: char) -> Table {
    explode_detailed(input, delimiter).table
}

/// Same as [`explode_with`], also reporting which columns were split.
///
/// Pieces are not trimmed and empty pieces are kept. Exploded cells become
/// strings (a null cell becomes `""`); cells of columns that are not
/// exploded keep their original value.
pub fn explode_detailed(input: &Table, delimiter: char) -> ExplodeOutcome {
    let mut working = input.clone();
    let mut exploded_columns = Vec::new();

    for (col, name) in input.columns().iter().enumerate() {
        // Earlier explosions only duplicate this column's cells, so testing
        // the working table gives the same answer as testing the input.
        if !column_contains(&working, col, delimiter) {
            continue;
        }
        working = explode_column(working, col, delimiter);
        exploded_columns.push(name.clone());
    }

    ExplodeOutcome {
        table: working,
        exploded_columns,
    }
}

/// Replace each row by one row per piece of its `col` cell.
fn explode_column(table: Table, col: usize, delimiter: char) -> Table {
    let (columns, rows) = table.into_parts();
    let mut exploded = Vec::with_capacity(rows.len());

    for row in rows {
        let text = cell_text(&row[col]).into_owned();
        for piece in text.split(delimiter) {
            let mut replica = row.clone();
            replica[col] = Value::String(piece.to_string());
            exploded.push(replica);
        }
    }

    Table::from_rows(columns, exploded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column(table: &Table, name: &str) -> Vec<Value> {
        let idx = table.column_index(name).unwrap();
        table.column_values(idx).cloned().collect()
    }

    #[test]
    fn test_tags_example() {
        let table = Table::from_strings(["tags", "name"], [vec!["x,y,z", "Bob"]]);
        let out = explode(&table);

        assert_eq!(out.len(), 3);
        assert_eq!(column(&out, "tags"), vec![json!("x"), json!("y"), json!("z")]);
        assert_eq!(column(&out, "name"), vec![json!("Bob"); 3]);
    }

    #[test]
    fn test_identity_without_commas() {
        let table = Table::from_rows(
            vec!["name".into(), "age".into(), "note".into()],
            vec![
                vec![json!("Ann"), json!(31), Value::Null],
                vec![json!("Bo"), json!(true), json!("a;b")],
            ],
        );

        let outcome = explode_detailed(&table, DEFAULT_DELIMITER);

        assert_eq!(outcome.table, table);
        assert!(outcome.exploded_columns.is_empty());
    }

    #[test]
    fn test_row_count_law() {
        let table = Table::from_strings(
            ["id", "list"],
            [vec!["1", "a,b"], vec!["2", "c"], vec!["3", "d,e,f,g"]],
        );
        let out = explode(&table);

        assert_eq!(out.len(), 2 + 1 + 4);
        assert_eq!(
            column(&out, "id"),
            ["1", "1", "2", "3", "3", "3", "3"].map(|s| json!(s)).to_vec()
        );
    }

    #[test]
    fn test_compounding_law() {
        let table = Table::from_strings(
            ["a", "b", "c"],
            [vec!["x,y", "1,2,3", "keep"], vec!["z", "4,5", "keep2"]],
        );
        let outcome = explode_detailed(&table, ',');
        let out = &outcome.table;

        assert_eq!(out.len(), 2 * 3 + 2);
        assert_eq!(outcome.exploded_columns, vec!["a", "b"]);
        assert_eq!(
            out.raw_rows()[..3].to_vec(),
            vec![
                vec![json!("x"), json!("1"), json!("keep")],
                vec![json!("x"), json!("2"), json!("keep")],
                vec![json!("x"), json!("3"), json!("keep")],
            ]
        );
        assert_eq!(out.raw_rows()[3][0], json!("y"));
        assert_eq!(out.raw_rows()[7], vec![json!("z"), json!("5"), json!("keep2")]);
    }

    #[test]
    fn test_pieces_not_trimmed_and_empties_kept() {
        let table = Table::from_strings(["v"], [vec!["a, b"], vec!["c,,d"], vec!["e,"]]);
        let out = explode(&table);

        assert_eq!(
            column(&out, "v"),
            ["a", " b", "c", "", "d", "e", ""].map(|s| json!(s)).to_vec()
        );
    }

    #[test]
    fn test_null_and_numbers_in_exploded_column() {
        let table = Table::from_rows(
            vec!["v".into(), "n".into()],
            vec![
                vec![json!("a,b"), json!(7)],
                vec![Value::Null, json!(8)],
                vec![json!(3), json!(9)],
            ],
        );
        let out = explode(&table);

        assert_eq!(column(&out, "v"), ["a", "b", "", "3"].map(|s| json!(s)).to_vec());
        // The untouched column keeps its numbers.
        assert_eq!(column(&out, "n"), vec![json!(7), json!(7), json!(8), json!(9)]);
    }

    #[test]
    fn test_custom_delimiter() {
        let table = Table::from_strings(["v", "w"], [vec!["a;b", "c,d"]]);
        let out = explode_with(&table, ';');

        assert_eq!(out.len(), 2);
        assert_eq!(column(&out, "w"), vec![json!("c,d"); 2]);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(vec!["a".into()]);
        assert_eq!(explode(&table), table);
        assert_eq!(explode(&Table::default()), Table::default());
    }

    #[test]
    fn test_input_untouched() {
        let table = Table::from_strings(["v"], [vec!["a,b"]]);
        let before = table.clone();
        let _ = explode(&table);
        assert_eq!(table, before);
    }
}
