//! Column classification helpers shared by `expand` and `explode`.
//!
//! Both transforms need an explicit, documented notion of "the text of a
//! cell": a `null` cell reads as the empty string, strings are used verbatim,
//! numbers and booleans use their JSON text.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;

use crate::error::LayoutError;
use crate::models::Table;

/// Text used for a missing (`null`) cell.
pub const MISSING_TEXT: &str = "";

/// Canonical text representation of a cell.
pub fn cell_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(MISSING_TEXT),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        other => Cow::Owned(other.to_string()),
    }
}

/// The string inside a cell, if it is a string with non-whitespace content.
///
/// Only real strings qualify: `null`, numbers and blank strings return `None`.
pub fn non_blank_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

/// Whether any cell of a column contains `delimiter` in its canonical text.
pub fn column_contains(table: &Table, column: usize, delimiter: char) -> bool {
    table
        .column_values(column)
        .any(|v| cell_text(v).contains(delimiter))
}

// =============================================================================
// Base column exclusion
// =============================================================================

/// Decides which input columns are *not* base columns.
///
/// A column is excluded when its name is in the exact-name set or matches one
/// of the regex patterns. Everything else is carried into expanded rows.
#[derive(Debug, Clone, Default)]
pub struct BaseExclusion {
    names: HashSet<String>,
    patterns: Vec<Regex>,
}

impl BaseExclusion {
    /// Build an exclusion from exact names and regex patterns.
    pub fn new<N, P>(names: N, patterns: P) -> Result<Self, LayoutError>
    where
        N: IntoIterator,
        N::Item: Into<String>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|e| LayoutError::InvalidPattern {
                    pattern: p.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            names: names.into_iter().map(Into::into).collect(),
            patterns,
        })
    }

    /// Exclusion from exact names only.
    pub fn from_names<N>(names: N) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            patterns: Vec::new(),
        }
    }

    /// Add one more excluded name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    pub fn excludes(&self, column: &str) -> bool {
        self.names.contains(column) || self.patterns.iter().any(|re| re.is_match(column))
    }

    /// Indices of the base columns of `table`, in table order.
    pub fn base_columns(&self, table: &Table) -> Vec<usize> {
        table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| !self.excludes(name))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_text_coercion() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!("a,b")), "a,b");
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&json!(1.5)), "1.5");
        assert_eq!(cell_text(&json!(true)), "true");
    }

    #[test]
    fn test_non_blank_str() {
        assert_eq!(non_blank_str(&json!("a@x.com")), Some("a@x.com"));
        assert_eq!(non_blank_str(&json!(" a@x.com ")), Some(" a@x.com "));
        assert_eq!(non_blank_str(&json!("   ")), None);
        assert_eq!(non_blank_str(&json!("")), None);
        assert_eq!(non_blank_str(&Value::Null), None);
        assert_eq!(non_blank_str(&json!(12)), None);
    }

    #[test]
    fn test_exclusion_names_and_patterns() {
        let exclusion = BaseExclusion::new(["Full name"], ["^email_"]).unwrap();

        assert!(exclusion.excludes("email_1"));
        assert!(exclusion.excludes("email_3_title"));
        assert!(exclusion.excludes("Full name"));
        assert!(!exclusion.excludes("Email"));
        assert!(!exclusion.excludes("region"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = BaseExclusion::new(Vec::<String>::new(), ["^(email"]);
        assert!(matches!(result, Err(LayoutError::InvalidPattern { .. })));
    }

    #[test]
    fn test_base_columns_keep_order() {
        let table = Table::from_strings(
            ["company", "email_1", "city", "Full Name 1", "zip"],
            Vec::<Vec<&str>>::new(),
        );
        let exclusion = BaseExclusion::from_names(["Full Name 1"]).with_name("email_1");

        assert_eq!(exclusion.base_columns(&table), vec![0, 2, 4]);
    }

    #[test]
    fn test_column_contains() {
        let table = Table::from_rows(
            vec!["tags".into(), "n".into()],
            vec![vec![json!("x"), json!(1)], vec![json!("y,z"), Value::Null]],
        );
        assert!(column_contains(&table, 0, ','));
        assert!(!column_contains(&table, 1, ','));
        assert!(!column_contains(&table, 0, ';'));
    }
}
