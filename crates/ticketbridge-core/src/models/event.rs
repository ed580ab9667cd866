//! Host notification context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest subject accepted for a new issue, in characters.
pub const MAX_SUBJECT_LENGTH: usize = 200;

const UNLABELED_SUBJECT: &str = "<unlabeled event>";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: u64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    #[default]
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

/// Aggregate of repeated occurrences of the same error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: u64,
    pub project: Project,
    pub title: String,
    pub culprit: Option<String>,
    #[serde(default)]
    pub level: Level,
    /// Occurrences recorded so far, including the one being processed
    pub times_seen: u64,
    pub permalink: Option<String>,
}

/// A single occurrence of an error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub message: String,
    pub platform: Option<String>,
    pub datetime: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<(String, String)>,
}

impl Event {
    /// Subject line for tickets filed from this event: the first non-blank
    /// line of the message, cut to [`MAX_SUBJECT_LENGTH`] characters.
    pub fn default_subject(&self) -> String {
        let line = self
            .message
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or(UNLABELED_SUBJECT);

        line.chars().take(MAX_SUBJECT_LENGTH).collect()
    }
}

/// What the host hands to plugins when an event is processed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub group: Group,
    pub event: Event,
}

impl Notification {
    pub fn project(&self) -> &Project {
        &self.group.project
    }
}
