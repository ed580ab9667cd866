//! Redmine API types

use serde::{Deserialize, Serialize};

use crate::issue::IssuePayload;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerList {
    pub trackers: Vec<Tracker>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tracker {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuePriorityList {
    pub issue_priorities: Vec<IssuePriority>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssuePriority {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Body of `POST /issues.json`
#[derive(Debug, Serialize)]
pub struct CreateIssueRequest<'a> {
    pub issue: &'a IssuePayload,
}
