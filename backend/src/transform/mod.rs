//! Transformation module.
//!
//! - Columns: cell text coercion and base-column selection
//! - Layout: contact group configuration
//! - Expand: wide contact groups to one row per contact
//! - Explode: delimited cells to one row per piece
//! - Pipeline: load, transform, report

pub mod columns;
pub mod expand;
pub mod explode;
pub mod layout;
pub mod pipeline;

pub use columns::{cell_text, BaseExclusion, MISSING_TEXT};
pub use expand::{expand, expand_detailed, ExpandOutcome, CONTACT_FIELDS};
pub use explode::{explode, explode_detailed, explode_with, ExplodeOutcome, DEFAULT_DELIMITER};
pub use layout::{builtin_layouts, default_layout, numbered_layout, ContactGroup, ContactLayout, DEFAULT_LAYOUT_ID};
pub use pipeline::*;
