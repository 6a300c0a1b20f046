//! Layout Registry - store and reuse contact layouts
//!
//! Layouts are saved as JSON files and matched automatically against the
//! headers of an incoming CSV. The built-in layouts are always available and
//! cannot be modified or deleted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RegistryError, RegistryResult};
use crate::transform::layout::{builtin_layouts, default_layout, ContactLayout};

/// Directory where layouts are stored (relative to current dir)
pub const DEFAULT_REGISTRY_DIR: &str = ".targetron/layouts";

/// Environment variable overriding [`DEFAULT_REGISTRY_DIR`].
pub const REGISTRY_DIR_ENV: &str = "TARGETRON_LAYOUT_DIR";

/// Minimum share of a layout's columns that must be present to be a candidate.
const MIN_COMPATIBILITY: f64 = 0.5;

/// A stored layout with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLayout {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub layout: ContactLayout,
    /// Creation timestamp
    pub created_at: String,
    /// Last time this layout was used
    pub last_used: Option<String>,
    /// Number of times used
    pub use_count: u32,
    /// Built-in layouts live in memory only
    #[serde(default, skip_serializing)]
    pub builtin: bool,
}

impl StoredLayout {
    fn builtin(layout: ContactLayout) -> Self {
        Self {
            id: layout.name.clone(),
            name: layout.name.clone(),
            layout,
            created_at: String::new(),
            last_used: None,
            use_count: 0,
            builtin: true,
        }
    }
}

/// Registry for managing contact layouts
pub struct LayoutRegistry {
    registry_dir: PathBuf,
    layouts: HashMap<String, StoredLayout>,
}

impl LayoutRegistry {
    /// Open the registry at `$TARGETRON_LAYOUT_DIR`, or the default directory.
    pub fn new() -> Self {
        let dir = std::env::var(REGISTRY_DIR_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY_DIR.to_string());
        Self::with_dir(dir)
    }

    /// Open a registry in a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut registry = Self {
            registry_dir: dir.as_ref().to_path_buf(),
            layouts: HashMap::new(),
        };
        for layout in builtin_layouts() {
            let stored = StoredLayout::builtin(layout);
            registry.layouts.insert(stored.id.clone(), stored);
        }
        registry.load_all();
        registry
    }

    pub fn dir(&self) -> &Path {
        &self.registry_dir
    }

    /// Load all layouts from the registry directory.
    ///
    /// Unreadable or invalid files are ignored, as are files that would
    /// shadow a built-in id.
    fn load_all(&mut self) {
        let Ok(entries) = fs::read_dir(&self.registry_dir) else {
            return;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(mut stored) = serde_json::from_str::<StoredLayout>(&content) else {
                continue;
            };
            if stored.layout.validate().is_err() || self.is_builtin(&stored.id) {
                continue;
            }
            stored.builtin = false;
            self.layouts.insert(stored.id.clone(), stored);
        }
    }

    fn is_builtin(&self, id: &str) -> bool {
        self.layouts.get(id).is_some_and(|l| l.builtin)
    }

    /// All layouts, built-ins first, then by name.
    pub fn list(&self) -> Vec<&StoredLayout> {
        let mut layouts: Vec<&StoredLayout> = self.layouts.values().collect();
        layouts.sort_by(|a, b| b.builtin.cmp(&a.builtin).then_with(|| a.name.cmp(&b.name)));
        layouts
    }

    /// Get a layout by ID
    pub fn get(&self, id: &str) -> Option<&StoredLayout> {
        self.layouts.get(id)
    }

    /// Find layouts compatible with the given CSV headers.
    ///
    /// Sorted by compatibility score (descending), then use count, then
    /// built-ins first.
    pub fn find_compatible(&self, headers: &[String]) -> Vec<(&StoredLayout, f64)> {
        let mut compatible: Vec<_> = self
            .layouts
            .values()
            .filter_map(|stored| {
                let score = compatibility(&stored.layout.referenced_columns(), headers);
                (score > MIN_COMPATIBILITY).then_some((stored, score))
            })
            .collect();

        compatible.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.use_count.cmp(&a.0.use_count))
                .then_with(|| b.0.builtin.cmp(&a.0.builtin))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        compatible
    }

    /// Best layout for the headers, or the default layout when none is compatible.
    pub fn best_match(&self, headers: &[String]) -> (String, ContactLayout) {
        match self.find_compatible(headers).first() {
            Some((stored, _)) => (stored.id.clone(), stored.layout.clone()),
            None => {
                let layout = default_layout();
                (layout.name.clone(), layout)
            }
        }
    }

    /// Save a new layout to the registry and return its id.
    pub fn save(&mut self, layout: ContactLayout, name: &str) -> RegistryResult<String> {
        layout.validate()?;
        fs::create_dir_all(&self.registry_dir)?;

        let id = self.generate_id(name);
        let stored = StoredLayout {
            id: id.clone(),
            name: name.to_string(),
            layout,
            created_at: chrono::Utc::now().to_rfc3339(),
            last_used: None,
            use_count: 0,
            builtin: false,
        };

        self.persist(&stored)?;
        self.layouts.insert(id.clone(), stored);
        Ok(id)
    }

    /// Import a layout from a JSON file.
    pub fn import(&mut self, path: &Path, name: Option<&str>) -> RegistryResult<String> {
        let content = fs::read_to_string(path)?;
        let layout = ContactLayout::from_json(&content)?;

        let layout_name = name
            .map(str::to_string)
            .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .unwrap_or_else(|| layout.name.clone());

        self.save(layout, &layout_name)
    }

    /// Record that a layout was used. Built-ins only count in memory.
    pub fn record_use(&mut self, id: &str) -> RegistryResult<()> {
        let stored = self
            .layouts
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        stored.last_used = Some(chrono::Utc::now().to_rfc3339());
        stored.use_count += 1;

        if stored.builtin {
            return Ok(());
        }
        let stored = stored.clone();
        self.persist(&stored)
    }

    /// Delete a layout from the registry
    pub fn delete(&mut self, id: &str) -> RegistryResult<()> {
        let builtin = self
            .layouts
            .get(id)
            .map(|stored| stored.builtin)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if builtin {
            return Err(RegistryError::ReadOnly(id.to_string()));
        }

        self.layouts.remove(id);
        fs::remove_file(self.path_for(id))?;
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.registry_dir.join(format!("{}.json", id))
    }

    fn persist(&self, stored: &StoredLayout) -> RegistryResult<()> {
        let content = serde_json::to_string_pretty(stored)?;
        fs::write(self.path_for(&stored.id), content)?;
        Ok(())
    }

    /// Generate a unique ID from a name
    fn generate_id(&self, name: &str) -> String {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        let slug = if slug.is_empty() { "layout".to_string() } else { slug };

        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut id = format!("{}-{}", slug, timestamp);
        let mut n = 1;
        while self.layouts.contains_key(&id) {
            n += 1;
            id = format!("{}-{}-{}", slug, timestamp, n);
        }
        id
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Share of `expected` columns present in `headers` (case-insensitive).
fn compatibility(expected: &[String], headers: &[String]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }

    let headers_lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let match_count = expected
        .iter()
        .filter(|col| headers_lower.contains(&col.to_lowercase()))
        .count();

    match_count as f64 / expected.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::layout::{numbered_layout, ContactGroup, DEFAULT_LAYOUT_ID};
    use tempfile::tempdir;

    fn strings(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    fn custom_layout() -> ContactLayout {
        ContactLayout {
            name: "crm".to_string(),
            description: String::new(),
            groups: vec![ContactGroup::new("Email", "First", "Last", "Role", "Name", "Profile")],
            exclude_columns: vec![],
            exclude_patterns: vec![],
        }
    }

    #[test]
    fn test_compatibility_score() {
        let expected = strings(&["email_1", "Title", "Role"]);
        let headers = strings(&["EMAIL_1", "title", "Creator"]);

        let score = compatibility(&expected, &headers);
        assert!((score - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_builtins_always_listed() {
        let dir = tempdir().unwrap();
        let registry = LayoutRegistry::with_dir(dir.path().join("missing"));

        let ids: Vec<&str> = registry.list().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["numbered", "targetron"]);
    }

    #[test]
    fn test_best_match_prefers_numbered_headers() {
        let registry = LayoutRegistry::with_dir(tempdir().unwrap().path());
        let headers = numbered_layout().referenced_columns();

        let (id, layout) = registry.best_match(&headers);
        assert_eq!(id, "numbered");
        assert_eq!(layout, numbered_layout());
    }

    #[test]
    fn test_best_match_falls_back_to_default() {
        let registry = LayoutRegistry::with_dir(tempdir().unwrap().path());
        let (id, _) = registry.best_match(&strings(&["name", "city"]));
        assert_eq!(id, DEFAULT_LAYOUT_ID);
    }

    #[test]
    fn test_save_reload_and_delete() {
        let dir = tempdir().unwrap();
        let mut registry = LayoutRegistry::with_dir(dir.path());

        let id = registry.save(custom_layout(), "My CRM").unwrap();
        assert!(id.starts_with("my-crm-"));
        registry.record_use(&id).unwrap();

        let reloaded = LayoutRegistry::with_dir(dir.path());
        let stored = reloaded.get(&id).unwrap();
        assert_eq!(stored.layout, custom_layout());
        assert_eq!(stored.use_count, 1);
        assert!(!stored.builtin);

        let headers = strings(&["Email", "First", "Last", "Role", "Name", "Profile", "Company"]);
        assert_eq!(reloaded.best_match(&headers).0, id);

        registry.delete(&id).unwrap();
        assert!(LayoutRegistry::with_dir(dir.path()).get(&id).is_none());
    }

    #[test]
    fn test_builtins_are_read_only() {
        let mut registry = LayoutRegistry::with_dir(tempdir().unwrap().path());
        assert!(matches!(
            registry.delete(DEFAULT_LAYOUT_ID),
            Err(RegistryError::ReadOnly(_))
        ));
        assert!(matches!(registry.delete("nope"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_import_validates_file() {
        let dir = tempdir().unwrap();
        let mut registry = LayoutRegistry::with_dir(dir.path().join("layouts"));

        let good = dir.path().join("crm.json");
        fs::write(&good, custom_layout().to_json().unwrap()).unwrap();
        let id = registry.import(&good, None).unwrap();
        assert_eq!(registry.get(&id).unwrap().name, "crm");

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"name": "bad", "groups": []}"#).unwrap();
        assert!(matches!(
            registry.import(&bad, None),
            Err(RegistryError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_invalid_files_ignored_on_load() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("junk.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let registry = LayoutRegistry::with_dir(dir.path());
        assert_eq!(registry.list().len(), 2);
    }
}
