//! Reshape wide contact rows into one row per contact.
//!
//! A single input row may carry up to N contact groups side by side. Each
//! group whose email cell holds a non-blank string becomes one output row,
//! together with the row's base columns. The result is deduplicated on email.
//!
//! ```text
//! Wide input                                         Long output
//! ┌─────────┬─────────┬─────────┬────────┐          ┌─────────┬────────┐
//! │ email_1 │ email_2 │ email_3 │ region │          │ email   │ region │
//! ├─────────┼─────────┼─────────┼────────┤    →     ├─────────┼────────┤
//! │ a@x.com │         │ c@x.com │ US     │          │ a@x.com │ US     │
//! └─────────┴─────────┴─────────┴────────┘          │ c@x.com │ US     │
//!                                                   └─────────┴────────┘
//! ```
//!
//! Output columns are the six contact fields in [`CONTACT_FIELDS`] order,
//! followed by the base columns in input order.

use serde_json::Value;
use std::collections::HashSet;

use super::columns::{non_blank_str, BaseExclusion};
use super::layout::ContactGroup;
use crate::models::{Row, Table};

/// Output contact fields, in output column order.
///
/// An input column with one of these names is never carried as a base
/// column: the contact field always wins, for `email` and for the other five
/// fields alike. A base cell therefore cannot overwrite a group's `title` or
/// name values in the output row.
pub const CONTACT_FIELDS: [&str; 6] = [
    "first_name",
    "last_name",
    "full_name",
    "title",
    "linkedin_url",
    "email",
];

/// Result of an expansion with its bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandOutcome {
    /// The long table.
    pub table: Table,
    /// Contacts emitted before deduplication.
    pub emitted: usize,
    /// Contacts dropped because their email was already emitted.
    pub duplicates: usize,
    /// Base columns carried into every output row.
    pub base_columns: Vec<String>,
}

/// Expand a wide table into one row per contact, deduplicated by email.
///
/// Groups are visited in the given order for every row; a column referenced
/// by a group but absent from `input` reads as null. The first row emitted
/// for an email wins.
pub fn expand(input: &Table, groups: &[ContactGroup], exclusion: &BaseExclusion) -> Table {
    expand_detailed(input, groups, exclusion).table
}

/// Same as [`expand`], also reporting emission and duplicate counts.
pub fn expand_detailed(
    input: &Table,
    groups: &[ContactGroup],
    exclusion: &BaseExclusion,
) -> ExpandOutcome {
    // A base column that collides with an output field name would shadow it.
    let base: Vec<usize> = exclusion
        .base_columns(input)
        .into_iter()
        .filter(|&i| !CONTACT_FIELDS.contains(&input.columns()[i].as_str()))
        .collect();

    let columns: Vec<String> = CONTACT_FIELDS
        .iter()
        .map(|f| f.to_string())
        .chain(base.iter().map(|&i| input.columns()[i].clone()))
        .collect();
    let base_columns = columns[CONTACT_FIELDS.len()..].to_vec();

    let mut output = Table::new(columns);
    let mut seen: HashSet<String> = HashSet::new();
    let mut emitted = 0;
    let mut duplicates = 0;

    for row in input.rows() {
        for group in groups {
            let Some(email) = row.get(&group.email).and_then(non_blank_str) else {
                continue;
            };

            emitted += 1;
            if !seen.insert(email.to_string()) {
                duplicates += 1;
                continue;
            }

            output.push_row(contact_row(&row, group, email, &base));
        }
    }

    ExpandOutcome {
        table: output,
        emitted,
        duplicates,
        base_columns,
    }
}

/// Build one output row: contact fields, then base cells.
fn contact_row(row: &Row<'_>, group: &ContactGroup, email: &str, base: &[usize]) -> Vec<Value> {
    let field = |column: &str| row.get(column).cloned().unwrap_or(Value::Null);

    let mut cells = Vec::with_capacity(CONTACT_FIELDS.len() + base.len());
    cells.push(field(&group.first_name));
    cells.push(field(&group.last_name));
    cells.push(field(&group.full_name));
    cells.push(field(&group.title));
    cells.push(field(&group.linkedin));
    cells.push(Value::String(email.to_string()));
    cells.extend(base.iter().map(|&i| row.at(i).cloned().unwrap_or(Value::Null)));
    cells
}
