//! Settings and new-issue forms
//!
//! Submissions arrive as raw text keyed by field name. Validation returns
//! either the cleaned value or every error found, keyed by field, plus any
//! whole-form errors.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use ticketbridge_core::models::{OptionKey, TrackerConfig};
use ticketbridge_redmine::RedmineClient;
use url::Url;

pub type FormData = HashMap<String, String>;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_URL_MESSAGE: &str = "Enter a valid URL.";
pub const INVALID_NUMBER_MESSAGE: &str = "Enter a whole number.";
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON specified";
pub const NOT_AN_OBJECT_MESSAGE: &str = "JSON dictionary must be specified";
pub const AUTH_FAILED_MESSAGE: &str = "There was an issue authenticating with Redmine";

/// Longest title accepted by the new-issue form, in characters.
pub const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub form: Vec<String>,
}

impl ValidationErrors {
    pub fn add_field(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    /// Messages recorded against one field
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut messages: Vec<String> = self.form.clone();
        for (field, errors) in &self.fields {
            for error in errors {
                messages.push(format!("{}: {}", field, error));
            }
        }
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn field_text<'a>(data: &'a FormData, key: OptionKey) -> Option<&'a str> {
    data.get(key.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Check the URL and strip any trailing slashes.
pub fn clean_host(raw: &str) -> Result<String, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(REQUIRED_MESSAGE);
    }

    let parsed = Url::parse(raw).map_err(|_| INVALID_URL_MESSAGE)?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(INVALID_URL_MESSAGE);
    }

    Ok(raw.trim_end_matches('/').to_string())
}

/// Parse the extra-fields text. Blank input means no extra fields.
pub fn clean_extra_fields(raw: &str) -> Result<Map<String, Value>, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(NOT_AN_OBJECT_MESSAGE),
        Err(_) => Err(INVALID_JSON_MESSAGE),
    }
}

fn clean_integer(raw: &str) -> Result<i64, &'static str> {
    raw.trim().parse::<i64>().map_err(|_| INVALID_NUMBER_MESSAGE)
}

fn required_integer(data: &FormData, key: OptionKey, errors: &mut ValidationErrors) -> Option<i64> {
    match field_text(data, key) {
        None => {
            errors.add_field(key.as_str(), REQUIRED_MESSAGE);
            None
        }
        Some(raw) => clean_integer(raw)
            .map_err(|message| errors.add_field(key.as_str(), message))
            .ok(),
    }
}

/// Validate a settings submission, probing Redmine with the given
/// credentials when both host and key are usable.
pub async fn validate_options(data: &FormData) -> Result<TrackerConfig, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let host = match clean_host(data.get(OptionKey::Host.as_str()).map_or("", String::as_str)) {
        Ok(host) => Some(host),
        Err(message) => {
            errors.add_field(OptionKey::Host.as_str(), message);
            None
        }
    };

    let key = field_text(data, OptionKey::Key).map(str::to_string);
    if key.is_none() {
        errors.add_field(OptionKey::Key.as_str(), REQUIRED_MESSAGE);
    }

    let project_id = required_integer(data, OptionKey::ProjectId, &mut errors);
    let tracker_id = required_integer(data, OptionKey::TrackerId, &mut errors);

    let default_priority = match field_text(data, OptionKey::DefaultPriority) {
        None => None,
        Some(raw) => clean_integer(raw)
            .map_err(|message| errors.add_field(OptionKey::DefaultPriority.as_str(), message))
            .ok(),
    };

    let extra_fields = clean_extra_fields(
        data.get(OptionKey::ExtraFields.as_str())
            .map_or("", String::as_str),
    )
    .map_err(|message| errors.add_field(OptionKey::ExtraFields.as_str(), message))
    .ok();

    if let (Some(host), Some(key)) = (&host, &key) {
        let client = RedmineClient::new(host.as_str(), key.as_str());
        if let Err(e) = client.list_projects().await {
            tracing::warn!(%host, error = %e, "Redmine credential check failed");
            errors.add_form(AUTH_FAILED_MESSAGE);
        }
    }

    match (host, key, project_id, tracker_id, extra_fields) {
        (Some(host), Some(key), Some(project_id), Some(tracker_id), Some(extra_fields))
            if errors.is_empty() =>
        {
            Ok(TrackerConfig {
                host,
                key,
                project_id,
                tracker_id,
                default_priority,
                extra_fields,
            })
        }
        _ => Err(errors),
    }
}

/// Manual ticket filing form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssueForm {
    pub title: String,
    pub description: String,
}

impl NewIssueForm {
    pub fn validate(data: &FormData) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = data.get("title").map(|s| s.trim()).unwrap_or_default();
        if title.is_empty() {
            errors.add_field("title", REQUIRED_MESSAGE);
        } else if title.chars().count() > MAX_TITLE_LENGTH {
            errors.add_field(
                "title",
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    MAX_TITLE_LENGTH,
                    title.chars().count()
                ),
            );
        }

        let description = data.get("description").map(|s| s.trim()).unwrap_or_default();
        if description.is_empty() {
            errors.add_field("description", REQUIRED_MESSAGE);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            title: title.to_string(),
            description: description.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketbridge_core::json::to_indented_text;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn form(pairs: &[(&str, &str)]) -> FormData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn redmine(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects.json"))
            .and(header("X-Redmine-API-Key", "secret"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(serde_json::json!({"projects": []})),
            )
            .mount(&server)
            .await;
        server
    }

    fn complete_form(host: &str) -> FormData {
        form(&[
            ("host", host),
            ("key", "secret"),
            ("project_id", "3"),
            ("tracker_id", "1"),
            ("default_priority", ""),
            ("extra_fields", ""),
        ])
    }

    #[test]
    fn test_clean_host_strips_trailing_slashes() {
        assert_eq!(clean_host("http://x.example/").unwrap(), "http://x.example");
        assert_eq!(clean_host("http://x.example").unwrap(), "http://x.example");
        assert_eq!(clean_host("http://x.example///").unwrap(), "http://x.example");
        assert_eq!(
            clean_host("https://x.example/redmine/").unwrap(),
            "https://x.example/redmine"
        );
    }

    #[test]
    fn test_clean_host_rejects_garbage() {
        assert_eq!(clean_host(""), Err(REQUIRED_MESSAGE));
        assert_eq!(clean_host("bugs.example.org"), Err(INVALID_URL_MESSAGE));
        assert_eq!(clean_host("ftp://bugs.example.org"), Err(INVALID_URL_MESSAGE));
    }

    #[test]
    fn test_clean_extra_fields_blank() {
        assert!(clean_extra_fields("").unwrap().is_empty());
        assert!(clean_extra_fields("   \n ").unwrap().is_empty());
    }

    #[test]
    fn test_clean_extra_fields_requires_object() {
        for raw in ["[1,2]", "\"x\"", "5", "null", "true"] {
            assert_eq!(clean_extra_fields(raw), Err(NOT_AN_OBJECT_MESSAGE), "{}", raw);
        }
    }

    #[test]
    fn test_clean_extra_fields_invalid_json() {
        for raw in ["{", "{'a': 1}", "status_id=2", "{\"a\": }"] {
            assert_eq!(clean_extra_fields(raw), Err(INVALID_JSON_MESSAGE), "{}", raw);
        }
    }

    #[test]
    fn test_clean_extra_fields_normalizes_stably() {
        let parsed =
            clean_extra_fields(r#"{"status_id":2,"custom_fields":[{"id":1,"value":"é"}]}"#)
                .unwrap();
        let first = to_indented_text(&parsed).unwrap();
        let second = to_indented_text(&clean_extra_fields(&first).unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("{\n    \"status_id\": 2,"));
    }

    #[tokio::test]
    async fn test_validate_complete_form() {
        let server = redmine(200).await;
        let config = validate_options(&complete_form(&format!("{}/", server.uri())))
            .await
            .unwrap();

        assert_eq!(config.host, server.uri());
        assert_eq!(config.project_id, 3);
        assert_eq!(config.tracker_id, 1);
        assert_eq!(config.default_priority, None);
        assert!(config.extra_fields.is_empty());
    }

    #[tokio::test]
    async fn test_validate_with_priority_and_extra_fields() {
        let server = redmine(200).await;
        let mut data = complete_form(&server.uri());
        data.insert("default_priority".to_string(), "6".to_string());
        data.insert("extra_fields".to_string(), r#"{"status_id": 2}"#.to_string());

        let config = validate_options(&data).await.unwrap();
        assert_eq!(config.default_priority, Some(6));
        assert_eq!(config.extra_fields_text().unwrap(), "{\n    \"status_id\": 2\n}");
    }

    #[tokio::test]
    async fn test_validate_missing_required_fields() {
        let server = redmine(200).await;
        for missing in ["host", "key", "project_id", "tracker_id"] {
            let mut data = complete_form(&server.uri());
            data.remove(missing);

            let errors = validate_options(&data).await.unwrap_err();
            assert_eq!(errors.field(missing), [REQUIRED_MESSAGE.to_string()], "{}", missing);
        }
    }

    #[tokio::test]
    async fn test_validate_non_numeric_ids() {
        let server = redmine(200).await;
        let mut data = complete_form(&server.uri());
        data.insert("project_id".to_string(), "web".to_string());
        data.insert("default_priority".to_string(), "high".to_string());

        let errors = validate_options(&data).await.unwrap_err();
        assert_eq!(errors.field("project_id"), [INVALID_NUMBER_MESSAGE.to_string()]);
        assert_eq!(errors.field("default_priority"), [INVALID_NUMBER_MESSAGE.to_string()]);
        assert!(errors.form.is_empty());
    }

    #[tokio::test]
    async fn test_validate_bad_extra_fields() {
        let server = redmine(200).await;
        let mut data = complete_form(&server.uri());
        data.insert("extra_fields".to_string(), "[1, 2]".to_string());

        let errors = validate_options(&data).await.unwrap_err();
        assert_eq!(errors.field("extra_fields"), [NOT_AN_OBJECT_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_validate_failed_probe() {
        let server = redmine(401).await;
        let errors = validate_options(&complete_form(&server.uri()))
            .await
            .unwrap_err();

        assert_eq!(errors.form, vec![AUTH_FAILED_MESSAGE.to_string()]);
        assert!(errors.fields.is_empty());
    }

    #[tokio::test]
    async fn test_validate_unreachable_host() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let errors = validate_options(&complete_form(&uri)).await.unwrap_err();
        assert_eq!(errors.form, vec![AUTH_FAILED_MESSAGE.to_string()]);
    }

    #[test]
    fn test_new_issue_form() {
        let issue = NewIssueForm::validate(&form(&[
            ("title", "  Sentry:KeyError  "),
            ("description", "<p>trace</p>"),
        ]))
        .unwrap();
        assert_eq!(issue.title, "Sentry:KeyError");
    }

    #[test]
    fn test_new_issue_form_errors() {
        let errors = NewIssueForm::validate(&form(&[("title", ""), ("description", " ")]))
            .unwrap_err();
        assert_eq!(errors.field("title"), [REQUIRED_MESSAGE.to_string()]);
        assert_eq!(errors.field("description"), [REQUIRED_MESSAGE.to_string()]);

        let long_title = "x".repeat(MAX_TITLE_LENGTH + 1);
        let errors = NewIssueForm::validate(&form(&[
            ("title", long_title.as_str()),
            ("description", "d"),
        ]))
        .unwrap_err();
        assert_eq!(errors.field("title").len(), 1);
        assert!(errors.field("title")[0].contains("at most 200"));
    }

    #[test]
    fn test_errors_display() {
        let mut errors = ValidationErrors::default();
        errors.add_form(AUTH_FAILED_MESSAGE);
        errors.add_field("key", REQUIRED_MESSAGE);
        assert_eq!(
            errors.to_string(),
            "There was an issue authenticating with Redmine; key: This field is required."
        );
    }
}
