//! Tracker configuration

use crate::{json, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Priority used when the project does not set one.
pub const DEFAULT_PRIORITY: i64 = 4;

/// Options that must be present and truthy before any ticket is filed.
pub const REQUIRED_OPTIONS: [OptionKey; 4] = [
    OptionKey::Host,
    OptionKey::Key,
    OptionKey::ProjectId,
    OptionKey::TrackerId,
];

/// Option names surfaced to the host's settings UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    Host,
    Key,
    ProjectId,
    TrackerId,
    DefaultPriority,
    ExtraFields,
}

impl OptionKey {
    pub const ALL: [OptionKey; 6] = [
        OptionKey::Host,
        OptionKey::Key,
        OptionKey::ProjectId,
        OptionKey::TrackerId,
        OptionKey::DefaultPriority,
        OptionKey::ExtraFields,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::Host => "host",
            OptionKey::Key => "key",
            OptionKey::ProjectId => "project_id",
            OptionKey::TrackerId => "tracker_id",
            OptionKey::DefaultPriority => "default_priority",
            OptionKey::ExtraFields => "extra_fields",
        }
    }
}

/// Per-project Redmine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    /// Base URL, never with a trailing slash
    pub host: String,
    pub key: String,
    pub project_id: i64,
    pub tracker_id: i64,
    pub default_priority: Option<i64>,
    #[serde(default)]
    pub extra_fields: Map<String, Value>,
}

impl TrackerConfig {
    /// Priority sent with new issues
    pub fn priority(&self) -> i64 {
        self.default_priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Validation("Host cannot be empty".to_string()));
        }

        if !self.host.starts_with("http://") && !self.host.starts_with("https://") {
            return Err(Error::Validation(
                "Host must start with http:// or https://".to_string(),
            ));
        }

        if self.host.ends_with('/') {
            return Err(Error::Validation(
                "Host must not end with a slash".to_string(),
            ));
        }

        if self.key.trim().is_empty() {
            return Err(Error::Validation("API key cannot be empty".to_string()));
        }

        Ok(())
    }

    /// Extra fields in their stored text form; empty when there are none.
    pub fn extra_fields_text(&self) -> Result<String> {
        if self.extra_fields.is_empty() {
            return Ok(String::new());
        }
        json::to_indented_text(&self.extra_fields)
    }

    /// Build a configuration from stored option values.
    ///
    /// Integer options may be stored either as JSON numbers or as numeric
    /// strings, since form submissions arrive as text.
    pub fn from_options<F>(get: F) -> Result<Self>
    where
        F: Fn(OptionKey) -> Option<Value>,
    {
        let host = required_string(&get, OptionKey::Host)?;
        let key = required_string(&get, OptionKey::Key)?;
        let project_id = required_integer(&get, OptionKey::ProjectId)?;
        let tracker_id = required_integer(&get, OptionKey::TrackerId)?;
        let default_priority = optional_integer(&get, OptionKey::DefaultPriority)?;

        let extra_fields = match get(OptionKey::ExtraFields) {
            None | Some(Value::Null) => Map::new(),
            Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
            Some(Value::String(text)) => match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                _ => return Err(extra_fields_not_an_object()),
            },
            Some(Value::Object(map)) => map,
            Some(_) => return Err(extra_fields_not_an_object()),
        };

        let config = Self {
            host: host.trim_end_matches('/').to_string(),
            key,
            project_id,
            tracker_id,
            default_priority,
            extra_fields,
        };
        config.validate()?;
        Ok(config)
    }

    /// Option values to persist, in settings order.
    pub fn to_options(&self) -> Result<Vec<(OptionKey, Value)>> {
        Ok(vec![
            (OptionKey::Host, Value::from(self.host.clone())),
            (OptionKey::Key, Value::from(self.key.clone())),
            (OptionKey::ProjectId, Value::from(self.project_id)),
            (OptionKey::TrackerId, Value::from(self.tracker_id)),
            (
                OptionKey::DefaultPriority,
                self.default_priority.map(Value::from).unwrap_or(Value::Null),
            ),
            (OptionKey::ExtraFields, Value::from(self.extra_fields_text()?)),
        ])
    }
}

fn extra_fields_not_an_object() -> Error {
    Error::Validation("extra_fields must be a JSON object".to_string())
}

fn required_string<F>(get: &F, key: OptionKey) -> Result<String>
where
    F: Fn(OptionKey) -> Option<Value>,
{
    match get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        _ => Err(Error::NotConfigured(key.as_str().to_string())),
    }
}

fn required_integer<F>(get: &F, key: OptionKey) -> Result<i64>
where
    F: Fn(OptionKey) -> Option<Value>,
{
    optional_integer(get, key)?.ok_or_else(|| Error::NotConfigured(key.as_str().to_string()))
}

fn optional_integer<F>(get: &F, key: OptionKey) -> Result<Option<i64>>
where
    F: Fn(OptionKey) -> Option<Value>,
{
    match get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
            Error::Validation(format!("{} must be a whole number", key.as_str()))
        }),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| {
            Error::Validation(format!("{} must be a whole number", key.as_str()))
        }),
        Some(_) => Err(Error::Validation(format!(
            "{} must be a whole number",
            key.as_str()
        ))),
    }
}
