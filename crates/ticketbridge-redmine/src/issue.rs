//! Issue payloads and links

use serde::Serialize;
use serde_json::{Map, Value};
use ticketbridge_core::models::TrackerConfig;
use url::Url;

use crate::{Error, Result};

/// Fields of a new Redmine issue.
///
/// Text stays as Rust strings until the request body is serialized, which
/// writes it out as UTF-8.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IssuePayload {
    fields: Map<String, Value>,
}

impl IssuePayload {
    /// Merge the project's settings with a title and description.
    ///
    /// Extra fields are applied last and replace any default of the same name.
    pub fn build(title: &str, description: &str, config: &TrackerConfig) -> Self {
        let mut fields = Map::new();
        fields.insert("project_id".to_string(), Value::from(config.project_id));
        fields.insert("tracker_id".to_string(), Value::from(config.tracker_id));
        fields.insert("priority_id".to_string(), Value::from(config.priority()));
        fields.insert("subject".to_string(), Value::from(title));
        fields.insert("description".to_string(), Value::from(description));

        for (key, value) in &config.extra_fields {
            fields.insert(key.clone(), value.clone());
        }

        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// A ticket that Redmine accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    pub id: i64,
    pub url: String,
}

/// Pull `issue.id` out of a creation response.
pub fn parse_created_issue(response: &Value) -> Result<i64> {
    response
        .get("issue")
        .and_then(|issue| issue.get("id"))
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::InvalidResponse("Unable to create redmine ticket".to_string()))
}

/// Browsable URL of an issue, keeping any path the Redmine host is mounted under.
pub fn issue_url(host: &str, issue_id: i64) -> Result<String> {
    let mut base = Url::parse(host)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(&format!("issues/{}", issue_id))?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(extra_fields: Value) -> TrackerConfig {
        TrackerConfig {
            host: "http://bugs.example.org".to_string(),
            key: "secret".to_string(),
            project_id: 3,
            tracker_id: 1,
            default_priority: None,
            extra_fields: extra_fields.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_build_payload() {
        let payload = IssuePayload::build("Broken", "<p>details</p>", &config(json!({})));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "project_id": 3,
                "tracker_id": 1,
                "priority_id": 4,
                "subject": "Broken",
                "description": "<p>details</p>"
            })
        );
    }

    #[test]
    fn test_build_payload_uses_configured_priority() {
        let mut config = config(json!({}));
        config.default_priority = Some(6);
        let payload = IssuePayload::build("Broken", "details", &config);
        assert_eq!(payload.get("priority_id"), Some(&json!(6)));
    }

    #[test]
    fn test_extra_fields_override_defaults() {
        let payload = IssuePayload::build(
            "Broken",
            "details",
            &config(json!({
                "priority_id": 1,
                "status_id": 2,
                "custom_fields": [{"id": 5, "value": "x"}]
            })),
        );
        assert_eq!(payload.get("priority_id"), Some(&json!(1)));
        assert_eq!(payload.get("status_id"), Some(&json!(2)));
        assert_eq!(payload.get("custom_fields").unwrap()[0]["id"], 5);
        assert_eq!(payload.get("project_id"), Some(&json!(3)));
    }

    #[test]
    fn test_multibyte_text_kept_intact() {
        let payload = IssuePayload::build("café 🚀", "naïve résumé ✓", &config(json!({})));
        let body = serde_json::to_vec(&payload).unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("café 🚀"));
        assert!(text.contains("naïve résumé ✓"));
    }

    #[test]
    fn test_parse_created_issue() {
        assert_eq!(
            parse_created_issue(&json!({"issue": {"id": 42, "subject": "x"}})).unwrap(),
            42
        );
    }

    #[test]
    fn test_parse_created_issue_missing_id() {
        assert!(parse_created_issue(&json!({"issue": {"subject": "x"}})).is_err());
        assert!(parse_created_issue(&json!({"errors": ["Subject cannot be blank"]})).is_err());
        assert!(parse_created_issue(&json!({"issue": {"id": "42"}})).is_err());
    }

    #[test]
    fn test_issue_url() {
        assert_eq!(
            issue_url("http://bugs.example.org", 42).unwrap(),
            "http://bugs.example.org/issues/42"
        );
        assert_eq!(
            issue_url("http://bugs.example.org/", 42).unwrap(),
            "http://bugs.example.org/issues/42"
        );
    }

    #[test]
    fn test_issue_url_keeps_path() {
        assert_eq!(
            issue_url("https://example.org/redmine", 7).unwrap(),
            "https://example.org/redmine/issues/7"
        );
        assert_eq!(
            issue_url("https://example.org/tools/redmine/", 7).unwrap(),
            "https://example.org/tools/redmine/issues/7"
        );
    }

    #[test]
    fn test_issue_url_invalid_host() {
        assert!(matches!(issue_url("not a url", 1), Err(Error::Url(_))));
    }
}
