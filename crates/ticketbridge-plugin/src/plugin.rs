//! Redmine auto-ticket plugin
//!
//! Files a Redmine issue the first time an error group is seen, and backs the
//! host's manual "create issue" flow for the same project settings.

use async_trait::async_trait;
use std::sync::Arc;
use ticketbridge_core::models::{Group, Notification, Project, TrackerConfig};
use ticketbridge_core::storage::{self, OptionStore};
use ticketbridge_redmine::{issue_url, CreatedIssue, IssuePayload, RedmineClient};

use crate::error::{PluginError, Result};
use crate::forms::{self, FormData, NewIssueForm};
use crate::render::{
    render_html_body, CssInliner, DescriptionRenderer, KeepStyleBlocks, TeraRenderer,
};

pub const SLUG: &str = "redmine";
pub const TITLE: &str = "Redmine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = "ticketbridge Contributors";
pub const DESCRIPTION: &str =
    "Integrate Redmine issue tracking by linking a user account to a project.";
pub const RESOURCE_LINKS: [(&str, &str); 2] = [
    ("Bug Tracker", "https://github.com/yourusername/ticketbridge/issues"),
    ("Source", "https://github.com/yourusername/ticketbridge"),
];

const NEW_ISSUE_TITLE: &str = "Create Redmine Task";
const ISSUE_TITLE_PREFIX: &str = "Sentry:";

/// Hook the host calls after it has stored an event
#[async_trait]
pub trait NotificationPlugin: Send + Sync {
    /// Returns the created issue when one was filed, `None` when skipped.
    async fn post_process(&self, notification: &Notification) -> Result<Option<CreatedIssue>>;
}

pub struct RedmineAutoTicketPlugin {
    options: Arc<dyn OptionStore>,
    renderer: Arc<dyn DescriptionRenderer>,
    inliner: Arc<dyn CssInliner>,
}

impl RedmineAutoTicketPlugin {
    /// Plugin with the bundled description template and no CSS inlining.
    pub fn new(options: Arc<dyn OptionStore>) -> Result<Self> {
        Ok(Self {
            options,
            renderer: Arc::new(TeraRenderer::new()?),
            inliner: Arc::new(KeepStyleBlocks),
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DescriptionRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_inliner(mut self, inliner: Arc<dyn CssInliner>) -> Self {
        self.inliner = inliner;
        self
    }

    pub fn is_configured(&self, project: &Project) -> bool {
        storage::is_configured(self.options.as_ref(), &project.slug)
    }

    pub fn load_config(&self, project_slug: &str) -> Result<TrackerConfig> {
        Ok(storage::load_config(self.options.as_ref(), project_slug)?)
    }

    pub fn save_config(&self, project_slug: &str, config: &TrackerConfig) -> Result<()> {
        Ok(storage::save_config(self.options.as_ref(), project_slug, config)?)
    }

    /// Validate a settings submission without saving it.
    pub async fn validate_config(&self, form: &FormData) -> Result<TrackerConfig> {
        Ok(forms::validate_options(form).await?)
    }

    /// Validate a settings submission and store it for the project.
    pub async fn configure(&self, project_slug: &str, form: &FormData) -> Result<TrackerConfig> {
        let config = self.validate_config(form).await?;
        self.save_config(project_slug, &config)?;
        tracing::info!(project = project_slug, host = %config.host, "Redmine configured");
        Ok(config)
    }

    /// Only a group's first occurrence files a ticket; repeats never do.
    pub fn should_create_issue(&self, notification: &Notification) -> bool {
        self.is_configured(notification.project()) && notification.group.times_seen <= 1
    }

    pub fn build_description(&self, notification: &Notification) -> Result<String> {
        render_html_body(self.renderer.as_ref(), self.inliner.as_ref(), notification)
    }

    pub fn get_new_issue_title(&self) -> &'static str {
        NEW_ISSUE_TITLE
    }

    /// Prefilled values for the manual filing form
    pub fn get_initial_form_data(&self, notification: &Notification) -> Result<NewIssueForm> {
        Ok(NewIssueForm {
            title: format!("{}{}", ISSUE_TITLE_PREFIX, notification.group.title),
            description: self.build_description(notification)?,
        })
    }

    /// Manual filing path; returns the new issue's id.
    pub async fn create_issue(&self, group: &Group, form: &NewIssueForm) -> Result<i64> {
        let created = self.create_issue_in(&group.project.slug, form).await?;
        Ok(created.id)
    }

    pub async fn create_issue_in(
        &self,
        project_slug: &str,
        form: &NewIssueForm,
    ) -> Result<CreatedIssue> {
        let config = self.load_config(project_slug)?;
        self.file_issue(&config, &form.title, &form.description).await
    }

    pub fn get_issue_url(&self, group: &Group, issue_id: i64) -> Result<String> {
        self.issue_url_in(&group.project.slug, issue_id)
    }

    pub fn issue_url_in(&self, project_slug: &str, issue_id: i64) -> Result<String> {
        let host = self
            .options
            .get(project_slug, "host")
            .and_then(|value| value.as_str().map(str::to_string))
            .ok_or_else(|| {
                PluginError::NotConfigured(format!(
                    "Redmine host is not set for project '{}'",
                    project_slug
                ))
            })?;
        Ok(issue_url(&host, issue_id)?)
    }

    async fn file_issue(
        &self,
        config: &TrackerConfig,
        title: &str,
        description: &str,
    ) -> Result<CreatedIssue> {
        let client = RedmineClient::new(config.host.as_str(), config.key.as_str());
        let payload = IssuePayload::build(title, description, config);
        Ok(client.file_issue(&payload).await?)
    }
}

#[async_trait]
impl NotificationPlugin for RedmineAutoTicketPlugin {
    async fn post_process(&self, notification: &Notification) -> Result<Option<CreatedIssue>> {
        let project = notification.project();
        let group = &notification.group;

        if !self.is_configured(project) {
            tracing::debug!(project = %project.slug, "Redmine not configured, skipping");
            return Ok(None);
        }

        if group.times_seen > 1 {
            tracing::debug!(
                group_id = group.id,
                times_seen = group.times_seen,
                "Group already seen, skipping"
            );
            return Ok(None);
        }

        let config = self.load_config(&project.slug)?;
        let subject = notification.event.default_subject();
        let description = self.build_description(notification)?;

        let created = self.file_issue(&config, &subject, &description).await?;
        tracing::info!(
            project = %project.slug,
            group_id = group.id,
            issue_id = created.id,
            "Filed Redmine issue for new group"
        );
        Ok(Some(created))
    }
}
