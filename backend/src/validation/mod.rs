//! JSON Schema validation for contact layout files.
//!
//! Layouts are user-supplied configuration. They are checked against the
//! schema embedded from `schemas/contact-layout.json` before deserializing,
//! so a typo in a field name is reported as such instead of as a serde error
//! about a missing field somewhere else.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use targetron::validation::is_valid_layout;
//!
//! let layout = json!({
//!     "name": "crm",
//!     "groups": [{
//!         "email": "Email", "first_name": "First", "last_name": "Last",
//!         "title": "Title", "full_name": "Name", "linkedin": "LinkedIn"
//!     }]
//! });
//! assert!(is_valid_layout(&layout));
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static LAYOUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/contact-layout.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema (draft 7).
///
/// Returns every validation error message on failure.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick check: true when `data` satisfies `schema`.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a contact layout document.
pub fn validate_layout(data: &Value) -> Result<(), Vec<String>> {
    validate(&LAYOUT_SCHEMA, data)
}

/// Quick check against the layout schema.
pub fn is_valid_layout(data: &Value) -> bool {
    is_valid(&LAYOUT_SCHEMA, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group() -> Value {
        json!({
            "email": "email_1",
            "first_name": "email_1_first_name",
            "last_name": "email_1_last_name",
            "title": "email_1_title",
            "full_name": "Full Name 1",
            "linkedin": "LinkedIn Profile URL"
        })
    }

    #[test]
    fn test_valid_layout() {
        let layout = json!({
            "name": "single",
            "groups": [group()],
            "exclude_patterns": ["^email_"]
        });
        assert!(is_valid_layout(&layout));
    }

    #[test]
    fn test_missing_groups() {
        let layout = json!({ "name": "empty" });
        assert!(!is_valid_layout(&layout));
    }

    #[test]
    fn test_empty_group_list() {
        let layout = json!({ "name": "empty", "groups": [] });
        assert!(validate_layout(&layout).is_err());
    }

    #[test]
    fn test_unknown_group_field_reported() {
        let mut g = group();
        g["linkedin_url"] = json!("LinkedIn");
        let layout = json!({ "name": "typo", "groups": [g] });

        let errors = validate_layout(&layout).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors.iter().any(|e| e.contains("linkedin_url")));
    }

    #[test]
    fn test_builtin_layouts_pass_schema() {
        for layout in crate::transform::layout::builtin_layouts() {
            let value = serde_json::to_value(&layout).unwrap();
            assert!(is_valid_layout(&value), "{} should be valid", layout.name);
        }
    }
}
