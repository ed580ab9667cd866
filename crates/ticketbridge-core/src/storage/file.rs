//! JSON file option store

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::OptionStore;
use crate::{Error, Result};

type ProjectOptions = BTreeMap<String, Map<String, Value>>;

/// Options for every project kept in one pretty-printed JSON document
pub struct FileOptionStore {
    path: PathBuf,
    options: RwLock<ProjectOptions>,
}

impl FileOptionStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let options = Self::load(&path)?;
        Ok(Self {
            path,
            options: RwLock::new(options),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored options for a project
    pub fn project_options(&self, project: &str) -> Map<String, Value> {
        self.options
            .read()
            .ok()
            .and_then(|options| options.get(project).cloned())
            .unwrap_or_default()
    }

    fn load(path: &Path) -> Result<ProjectOptions> {
        if !path.exists() {
            return Ok(ProjectOptions::new());
        }

        let content = std::fs::read_to_string(path)?;

        // Handle empty file case
        if content.trim().is_empty() {
            return Ok(ProjectOptions::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, options: &ProjectOptions) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(options)?;
        std::fs::write(&self.path, content)?;

        Ok(())
    }
}

impl OptionStore for FileOptionStore {
    fn get(&self, project: &str, key: &str) -> Option<Value> {
        let options = self.options.read().ok()?;
        options.get(project)?.get(key).cloned()
    }

    fn set(&self, project: &str, key: &str, value: Value) -> Result<()> {
        let mut options = self
            .options
            .write()
            .map_err(|e| Error::Storage(e.to_string()))?;
        options
            .entry(project.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.save(&options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileOptionStore::open(temp_dir.path().join("options.json")).unwrap();
        assert!(store.get("web", "host").is_none());
        assert!(store.project_options("web").is_empty());
    }

    #[test]
    fn test_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("options.json");

        let store = FileOptionStore::open(&path).unwrap();
        store.set("web", "host", json!("http://bugs.example.org")).unwrap();
        store.set("web", "project_id", json!(4)).unwrap();

        let reopened = FileOptionStore::open(&path).unwrap();
        assert_eq!(reopened.get("web", "host"), Some(json!("http://bugs.example.org")));
        assert_eq!(reopened.get("web", "project_id"), Some(json!(4)));
        assert!(reopened.get("api", "host").is_none());
    }

    #[test]
    fn test_empty_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("options.json");
        std::fs::write(&path, "  \n").unwrap();

        let store = FileOptionStore::open(&path).unwrap();
        assert!(store.get("web", "host").is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("options.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(FileOptionStore::open(&path), Err(Error::Json(_))));
    }
}
