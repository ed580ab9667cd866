//! Plugin error types

use crate::forms::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Storage error: {0}")]
    Core(#[from] ticketbridge_core::Error),

    #[error("Redmine error: {0}")]
    Redmine(#[from] ticketbridge_redmine::Error),

    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, PluginError>;
