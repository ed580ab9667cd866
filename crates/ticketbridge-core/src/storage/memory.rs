//! In-memory option store

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;

use super::OptionStore;
use crate::{Error, Result};

#[derive(Default)]
pub struct MemoryOptionStore {
    options: RwLock<HashMap<String, Map<String, Value>>>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OptionStore for MemoryOptionStore {
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
        Ok(())
    }
}
