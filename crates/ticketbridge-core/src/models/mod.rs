pub mod config;
pub mod event;

pub use config::{OptionKey, TrackerConfig, DEFAULT_PRIORITY, REQUIRED_OPTIONS};
pub use event::{Event, Group, Level, Notification, Project};
