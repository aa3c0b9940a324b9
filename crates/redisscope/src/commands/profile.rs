//! Profile management commands

use redisscope_core::config::{Config, Profile};
use serde_json::{Value, json};
use tracing::info;

use crate::cli::ProfileCommands;
use crate::connection::ConnectionManager;
use crate::error::{RedisScopeError, Result};
use crate::output::{OutputFormat, print_output};

fn profile_json(config: &Config, name: &str, profile: &Profile) -> Value {
    json!({
        "name": name,
        "url": profile.redacted_url(),
        "databaseId": profile.database_id(name),
        "default": config.default_profile.as_deref() == Some(name),
    })
}

pub async fn handle_profile_command(
    command: &ProfileCommands,
    conn_mgr: &mut ConnectionManager,
    output: OutputFormat,
) -> Result<()> {
    match command {
        ProfileCommands::List => {
            let config = &conn_mgr.config;
            let profiles: Vec<Value> = config
                .list_profiles()
                .into_iter()
                .map(|(name, profile)| profile_json(config, name, profile))
                .collect();
            print_output(profiles, output)?;
        }
        ProfileCommands::Show { name } => {
            let config = &conn_mgr.config;
            let profile = config.profile(name)?;
            print_output(profile_json(config, name, profile), output)?;
        }
        ProfileCommands::Set {
            name,
            url,
            database_id,
        } => {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(RedisScopeError::InvalidInput {
                    message: format!("'{}' is not a redis:// or rediss:// URL", url),
                });
            }
            conn_mgr.config.set_profile(
                name.clone(),
                Profile {
                    url: url.clone(),
                    database_id: database_id.clone(),
                },
            );
            conn_mgr.save_config()?;
            info!(profile = %name, "Profile saved");
            println!("Profile '{}' saved", name);
        }
        ProfileCommands::Remove { name } => {
            if conn_mgr.config.remove_profile(name).is_none() {
                return Err(redisscope_core::config::ConfigError::ProfileNotFound {
                    name: name.clone(),
                }
                .into());
            }
            conn_mgr.save_config()?;
            println!("Profile '{}' removed", name);
        }
        ProfileCommands::Default { name } => {
            conn_mgr.config.profile(name)?;
            conn_mgr.config.default_profile = Some(name.clone());
            conn_mgr.save_config()?;
            println!("Default profile set to '{}'", name);
        }
        ProfileCommands::Path => {
            let path = match &conn_mgr.config_path {
                Some(path) => path.clone(),
                None => Config::config_path()?,
            };
            println!("{}", path.display());
        }
    }
    Ok(())
}
