//! ticketbridge core
//!
//! Domain models shared by the Redmine client and the plugin: tracker
//! configuration, host notification context and the option store seam.

pub mod error;
pub mod json;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
