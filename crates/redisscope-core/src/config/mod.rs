//! Configuration and profile management
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! - Multiple named profiles, each pointing at one Redis deployment
//! - Environment variable expansion in config files
//! - Platform-specific config file locations
//! - Workbench settings for command execution

pub mod config;
pub mod error;

pub use config::{Config, Profile, WorkbenchConfig};
pub use error::{ConfigError, Result};
