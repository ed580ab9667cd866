//! ticketbridge Redmine integration
//!
//! Client library for filing Redmine issues from error events.

pub mod auth;
pub mod client;
pub mod error;
pub mod issue;
pub mod types;

pub use client::RedmineClient;
pub use error::{Error, Result};
pub use issue::{issue_url, parse_created_issue, CreatedIssue, IssuePayload};
pub use types::*;
