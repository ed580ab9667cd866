//! ticketbridge Redmine plugin
//!
//! Turns error-tracker notifications into Redmine issues. Exposed as a
//! library so hosts and tests can drive it without the command-line tool.

pub mod error;
pub mod forms;
pub mod plugin;
pub mod render;

pub use error::{PluginError, Result};
pub use forms::{FormData, NewIssueForm, ValidationErrors};
pub use plugin::{NotificationPlugin, RedmineAutoTicketPlugin};
pub use render::{CssInliner, DescriptionRenderer, KeepStyleBlocks, TeraRenderer};
