//! Configuration management for redisscope
//!
//! Handles loading the TOML config file, profile resolution and the
//! workbench settings that tune command execution.

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};
use crate::execution::{DEFAULT_EXECUTIONS_LIMIT, DEFAULT_MAX_CONCURRENCY};
use crate::router::DEFAULT_MAX_RESULT_SIZE;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Profile used when none is given explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
    /// Command execution settings
    #[serde(default)]
    pub workbench: WorkbenchConfig,
}

/// One Redis deployment
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    /// `redis://` or `rediss://` URL of the entry node
    pub url: String,
    /// Identifier executions are stored under; defaults to the profile name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
}

impl Profile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database_id: None,
        }
    }

    /// Database id for this profile, falling back to its name
    pub fn database_id<'a>(&'a self, name: &'a str) -> &'a str {
        self.database_id.as_deref().unwrap_or(name)
    }

    /// URL with any password replaced, for display
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        match rest.rsplit_once('@') {
            Some((userinfo, host)) => match userinfo.split_once(':') {
                Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
                None => format!("{}://***@{}", scheme, host),
            },
            None => self.url.clone(),
        }
    }
}

/// Settings for command execution
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WorkbenchConfig {
    /// Responses larger than this many bytes are not stored
    #[serde(default = "default_max_result_size")]
    pub max_result_size: usize,
    /// Execution records kept per database
    #[serde(default = "default_executions_limit")]
    pub executions_limit: usize,
    /// Extra commands rejected before dispatch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsupported_commands: Vec<String>,
    /// Commands of one batch dispatched at the same time
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            max_result_size: default_max_result_size(),
            executions_limit: default_executions_limit(),
            unsupported_commands: Vec::new(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_result_size() -> usize {
    DEFAULT_MAX_RESULT_SIZE
}

fn default_executions_limit() -> usize {
    DEFAULT_EXECUTIONS_LIMIT
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Config {
    /// Resolve which profile to use
    ///
    /// Explicit name, then `default_profile`, then the first profile by name.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            if !self.profiles.contains_key(profile_name) {
                return Err(ConfigError::ProfileNotFound {
                    name: profile_name.to_string(),
                });
            }
            return Ok(profile_name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| name.to_string())
            .ok_or(ConfigError::NoProfiles)
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Find the profile whose database id is `database_id`
    pub fn profile_for_database(&self, database_id: &str) -> Option<(&str, &Profile)> {
        self.list_profiles()
            .into_iter()
            .find(|(name, profile)| profile.database_id(name) == database_id)
            .map(|(name, profile)| (name.as_str(), profile))
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);

        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS `~/.config/redisscope/config.toml` is preferred when it exists,
    /// otherwise the platform location from `directories` is used.
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("redisscope")
                    .join("config.toml");

                if linux_style_path
                    .parent()
                    .map(|p| p.exists())
                    .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "redis", "redisscope").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}`; unknown variables are left as-is
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}
