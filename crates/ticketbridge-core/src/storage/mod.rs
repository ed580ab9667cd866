//! Option storage
//!
//! The host owns plugin options. [`OptionStore`] is the seam the plugin reads
//! and writes them through; the bundled implementations serve tests and the
//! command-line tool.

pub mod file;
pub mod memory;

pub use file::FileOptionStore;
pub use memory::MemoryOptionStore;

use serde_json::Value;
use std::path::PathBuf;

use crate::models::{OptionKey, TrackerConfig, REQUIRED_OPTIONS};
use crate::{Error, Result};

/// Per-project key/value option storage
pub trait OptionStore: Send + Sync {
    fn get(&self, project: &str, key: &str) -> Option<Value>;

    fn set(&self, project: &str, key: &str, value: Value) -> Result<()>;
}

/// Host truthiness: null, false, zero and empty values count as unset.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// True when every required option is present and truthy for the project.
pub fn is_configured(store: &dyn OptionStore, project: &str) -> bool {
    REQUIRED_OPTIONS.iter().all(|key| {
        store
            .get(project, key.as_str())
            .as_ref()
            .is_some_and(is_truthy)
    })
}

/// Read the project's tracker configuration.
pub fn load_config(store: &dyn OptionStore, project: &str) -> Result<TrackerConfig> {
    if !is_configured(store, project) {
        return Err(Error::NotConfigured(format!(
            "Redmine is not configured for project '{}'",
            project
        )));
    }
    TrackerConfig::from_options(|key: OptionKey| store.get(project, key.as_str()))
}

/// Persist every option of a validated configuration.
pub fn save_config(store: &dyn OptionStore, project: &str, config: &TrackerConfig) -> Result<()> {
    for (key, value) in config.to_options()? {
        store.set(project, key.as_str(), value)?;
    }
    tracing::debug!(project, "Saved tracker options");
    Ok(())
}

pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("ticketbridge"))
        .ok_or_else(|| Error::Storage("Could not find config directory".to_string()))
}

pub fn init_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir()?;
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!(3)));
        assert!(is_truthy(&json!("x")));
    }

    #[test]
    fn test_is_configured_requires_all_options() {
        let store = MemoryOptionStore::new();
        store.set("web", "host", json!("http://bugs.example.org")).unwrap();
        store.set("web", "key", json!("secret")).unwrap();
        store.set("web", "project_id", json!(1)).unwrap();
        assert!(!is_configured(&store, "web"));

        store.set("web", "tracker_id", json!(0)).unwrap();
        assert!(!is_configured(&store, "web"));

        store.set("web", "tracker_id", json!(2)).unwrap();
        assert!(is_configured(&store, "web"));
        assert!(!is_configured(&store, "other"));
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryOptionStore::new();
        let config = TrackerConfig {
            host: "http://bugs.example.org".to_string(),
            key: "secret".to_string(),
            project_id: 1,
            tracker_id: 2,
            default_priority: None,
            extra_fields: json!({"status_id": 3}).as_object().cloned().unwrap(),
        };

        save_config(&store, "web", &config).unwrap();
        assert_eq!(
            store.get("web", "extra_fields"),
            Some(json!("{\n    \"status_id\": 3\n}"))
        );
        assert_eq!(load_config(&store, "web").unwrap(), config);
    }

    #[test]
    fn test_load_unconfigured() {
        let store = MemoryOptionStore::new();
        assert!(matches!(
            load_config(&store, "web"),
            Err(Error::NotConfigured(_))
        ));
    }
}
