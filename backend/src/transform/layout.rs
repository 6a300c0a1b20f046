//! Contact layout definition
//!
//! A layout says which columns of a wide export hold each repeated contact
//! group, and which other columns must be kept out of the base columns.
//! Exports from different tools disagree on naming (`LinkedIn Profile URL (2)`
//! versus `LinkedIn Profile URL 2`), so layouts are data, not code.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::columns::BaseExclusion;
use super::expand::{expand_detailed, ExpandOutcome};
use crate::error::LayoutError;
use crate::models::Table;
use crate::validation::validate_layout;

/// Column names of one repeated contact group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactGroup {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub full_name: String,
    pub linkedin: String,
}

impl ContactGroup {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        title: impl Into<String>,
        full_name: impl Into<String>,
        linkedin: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            title: title.into(),
            full_name: full_name.into(),
            linkedin: linkedin.into(),
        }
    }

    /// Group `n` using the `email_<n>`, `email_<n>_first_name`, ... convention.
    pub fn numbered(n: usize, full_name: impl Into<String>, linkedin: impl Into<String>) -> Self {
        Self::new(
            format!("email_{n}"),
            format!("email_{n}_first_name"),
            format!("email_{n}_last_name"),
            format!("email_{n}_title"),
            full_name,
            linkedin,
        )
    }

    /// All six column names, email first.
    pub fn columns(&self) -> [&str; 6] {
        [
            self.email.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.title.as_str(),
            self.full_name.as_str(),
            self.linkedin.as_str(),
        ]
    }
}

/// A named set of contact groups plus extra base-column exclusions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactLayout {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Groups in emission order.
    pub groups: Vec<ContactGroup>,

    /// Columns that are neither group columns nor base columns.
    #[serde(default)]
    pub exclude_columns: Vec<String>,

    /// Regex patterns of column names to keep out of the base columns.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl ContactLayout {
    /// Parse a layout from a JSON string, validating it against the layout schema.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a layout from a JSON value, validating it against the layout schema.
    pub fn from_value(value: &Value) -> Result<Self, LayoutError> {
        validate_layout(value).map_err(LayoutError::Schema)?;
        let layout: Self = serde_json::from_value(value.clone())?;
        layout.validate()?;
        Ok(layout)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Semantic checks the schema cannot express.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.groups.is_empty() {
            return Err(LayoutError::NoGroups(self.name.clone()));
        }
        // Compile once so bad patterns surface at load time.
        self.base_exclusion().map(|_| ())
    }

    /// Every column name the groups refer to, in group order, deduplicated.
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for group in &self.groups {
            for col in group.columns() {
                if !columns.iter().any(|c| c == col) {
                    columns.push(col.to_string());
                }
            }
        }
        columns
    }

    /// Group columns absent from `headers`.
    ///
    /// Missing columns read as null during expansion; this only exists so
    /// callers can warn about partially shaped inputs.
    pub fn validate_headers(&self, headers: &[String]) -> Result<(), Vec<String>> {
        let missing: Vec<String> = self
            .referenced_columns()
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h == col))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }

    /// The base-column exclusion: every group column plus the extra names and
    /// patterns.
    pub fn base_exclusion(&self) -> Result<BaseExclusion, LayoutError> {
        let names = self
            .referenced_columns()
            .into_iter()
            .chain(self.exclude_columns.iter().cloned());
        BaseExclusion::new(names, &self.exclude_patterns)
    }

    /// Expand a wide table with this layout.
    pub fn expand(&self, table: &Table) -> Result<ExpandOutcome, LayoutError> {
        let exclusion = self.base_exclusion()?;
        Ok(expand_detailed(table, &self.groups, &exclusion))
    }
}

// =============================================================================
// Built-in layouts
// =============================================================================

/// Id of the layout used when nothing else matches.
pub const DEFAULT_LAYOUT_ID: &str = "targetron";

/// Layout of the Targetron export: LinkedIn columns suffixed `(2)`, `(3)`.
pub fn default_layout() -> ContactLayout {
    ContactLayout {
        name: DEFAULT_LAYOUT_ID.to_string(),
        description: "Targetron export: email_N groups, LinkedIn URL suffixed (2)/(3)".to_string(),
        groups: vec![
            ContactGroup::numbered(1, "Full Name 1", "LinkedIn Profile URL"),
            ContactGroup::numbered(2, "Full Name 2", "LinkedIn Profile URL (2)"),
            ContactGroup::numbered(3, "Full Name 3", "LinkedIn Profile URL (3)"),
        ],
        exclude_columns: vec!["Full name".to_string()],
        exclude_patterns: vec!["^email_".to_string()],
    }
}

/// Layout of exports that number every repeated column ` 1`, ` 2`, ` 3`.
pub fn numbered_layout() -> ContactLayout {
    ContactLayout {
        name: "numbered".to_string(),
        description: "email_N groups, full name and LinkedIn URL suffixed 1/2/3".to_string(),
        groups: (1..=3)
            .map(|n| {
                ContactGroup::numbered(n, format!("Full Name {n}"), format!("LinkedIn Profile URL {n}"))
            })
            .collect(),
        exclude_columns: vec!["Full name".to_string()],
        exclude_patterns: vec!["^email_".to_string()],
    }
}

/// All built-in layouts, default first.
pub fn builtin_layouts() -> Vec<ContactLayout> {
    vec![default_layout(), numbered_layout()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layout_serialization() {
        let layout = default_layout();
        let json = layout.to_json().unwrap();
        let parsed = ContactLayout::from_json(&json).unwrap();
        assert_eq!(parsed, layout);
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let layout = ContactLayout::from_value(&json!({
            "name": "minimal",
            "groups": [{
                "email": "Email",
                "first_name": "First",
                "last_name": "Last",
                "title": "Title",
                "full_name": "Name",
                "linkedin": "LinkedIn"
            }]
        }))
        .unwrap();

        assert!(layout.exclude_columns.is_empty());
        assert!(layout.exclude_patterns.is_empty());
        assert_eq!(layout.groups[0].email, "Email");
    }

    #[test]
    fn test_schema_violation() {
        let result = ContactLayout::from_value(&json!({
            "name": "broken",
            "groups": [{ "email": "Email" }]
        }));
        assert!(matches!(result, Err(LayoutError::Schema(_))));
    }

    #[test]
    fn test_bad_pattern_rejected_at_load() {
        let mut layout = default_layout();
        layout.exclude_patterns = vec!["[".to_string()];
        let json = layout.to_json().unwrap();

        assert!(matches!(
            ContactLayout::from_json(&json),
            Err(LayoutError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_layout_without_groups() {
        let mut layout = numbered_layout();
        layout.groups.clear();
        assert!(matches!(layout.validate(), Err(LayoutError::NoGroups(name)) if name == "numbered"));
    }

    #[test]
    fn test_referenced_columns() {
        let columns = default_layout().referenced_columns();
        assert_eq!(columns.len(), 18);
        assert_eq!(columns[0], "email_1");
        assert!(columns.contains(&"LinkedIn Profile URL (3)".to_string()));
    }

    #[test]
    fn test_validate_headers() {
        let layout = numbered_layout();
        let mut headers = layout.referenced_columns();
        assert!(layout.validate_headers(&headers).is_ok());

        headers.retain(|h| h != "email_3_title");
        assert_eq!(
            layout.validate_headers(&headers),
            Err(vec!["email_3_title".to_string()])
        );
    }

    #[test]
    fn test_base_exclusion_covers_groups_and_extras() {
        let exclusion = default_layout().base_exclusion().unwrap();

        assert!(exclusion.excludes("Full Name 2"));
        assert!(exclusion.excludes("LinkedIn Profile URL"));
        assert!(exclusion.excludes("Full name"));
        assert!(exclusion.excludes("email_7_phone"));
        assert!(!exclusion.excludes("Company"));
    }
}
