//! Redmine REST client

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::auth::ApiKeyAuth;
use crate::issue::{issue_url, parse_created_issue, CreatedIssue, IssuePayload};
use crate::types::{CreateIssueRequest, IssuePriority, IssuePriorityList, Tracker, TrackerList};
use crate::{Error, Result};

/// Thin wrapper over the few Redmine endpoints the plugin needs.
///
/// One request per call: no retries, no timeout beyond the HTTP client's
/// defaults.
#[derive(Debug, Clone)]
pub struct RedmineClient {
    http: Client,
    host: String,
    auth: ApiKeyAuth,
}

impl RedmineClient {
    pub fn new(host: impl Into<String>, key: impl Into<String>) -> Self {
        Self::with_http_client(Client::new(), host, key)
    }

    /// Reuse an existing HTTP client (connection pool, proxy settings).
    pub fn with_http_client(http: Client, host: impl Into<String>, key: impl Into<String>) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self {
            http,
            host,
            auth: ApiKeyAuth::new(key.into()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// List projects visible to the API key. Only used to prove the
    /// credentials work.
    pub async fn list_projects(&self) -> Result<Value> {
        self.get("/projects.json").await
    }

    pub async fn list_trackers(&self) -> Result<Vec<Tracker>> {
        let value = self.get("/trackers.json").await?;
        let list: TrackerList = serde_json::from_value(value)?;
        Ok(list.trackers)
    }

    pub async fn list_issue_priorities(&self) -> Result<Vec<IssuePriority>> {
        let value = self.get("/enumerations/issue_priorities.json").await?;
        let list: IssuePriorityList = serde_json::from_value(value)?;
        Ok(list.issue_priorities)
    }

    /// Create an issue and return Redmine's decoded response.
    ///
    /// Not idempotent: calling this twice files two tickets.
    pub async fn create_issue(&self, payload: &IssuePayload) -> Result<Value> {
        let request = self
            .http
            .post(self.endpoint("/issues.json"))
            .header(CONTENT_TYPE, "application/json")
            .json(&CreateIssueRequest { issue: payload });

        self.send("POST", "/issues.json", request).await
    }

    /// Create an issue and resolve its id and browsable URL.
    pub async fn file_issue(&self, payload: &IssuePayload) -> Result<CreatedIssue> {
        let response = self.create_issue(payload).await?;
        let id = parse_created_issue(&response)?;
        let url = issue_url(&self.host, id)?;
        tracing::info!(issue_id = id, %url, "Created Redmine issue");
        Ok(CreatedIssue { id, url })
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let request = self.http.get(self.endpoint(path));
        self.send("GET", path, request).await
    }

    async fn send(&self, method: &str, path: &str, request: RequestBuilder) -> Result<Value> {
        tracing::debug!(method, path, host = %self.host, "Redmine request");

        let response = self.auth.apply(request).send().await.map_err(|e| {
            tracing::warn!(method, path, error = %e, "Redmine request failed");
            Error::Http(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(method, path, status = status.as_u16(), "Redmine returned an error");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Error::Auth(format!("Redmine rejected the API key ({})", status))
                }
                _ => Error::Api {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
