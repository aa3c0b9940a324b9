//! Resolve which deployment a command talks to

use std::path::PathBuf;
use std::sync::Arc;

use redisscope_core::client::{ClientMetadata, CommandClient, RedisConnectionProvider};
use redisscope_core::config::Config;
use redisscope_core::execution::{ExecutionOrchestrator, InMemoryCommandExecutionStore};
use redisscope_core::router::{CommandRouter, RouterOptions, UnsupportedCommands};
use redisscope_core::ConnectionProvider;
use tracing::debug;

use crate::error::Result;

/// Database id used for `--url` targets
pub const URL_DATABASE_ID: &str = "url";

/// A resolved connection target
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub database_id: String,
    pub url: String,
}

/// Owns the loaded config and builds clients from it
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    url_override: Option<String>,
}

impl ConnectionManager {
    pub fn with_config_path(
        config: Config,
        config_path: Option<PathBuf>,
        url_override: Option<String>,
    ) -> Self {
        Self {
            config,
            config_path,
            url_override,
        }
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self) -> Result<()> {
        match &self.config_path {
            Some(path) => self.config.save_to_path(path)?,
            None => self.config.save()?,
        }
        Ok(())
    }

    /// `--url` wins over profiles
    pub fn resolve_target(&self, profile: Option<&str>) -> Result<Target> {
        if let Some(url) = &self.url_override {
            debug!("Using URL from command line");
            return Ok(Target {
                database_id: URL_DATABASE_ID.to_string(),
                url: url.clone(),
            });
        }

        let name = self.config.resolve_profile(profile)?;
        let profile = self.config.profile(&name)?;
        debug!(profile = %name, "Using profile");
        Ok(Target {
            database_id: profile.database_id(&name).to_string(),
            url: profile.url.clone(),
        })
    }

    fn provider(&self, target: &Target) -> RedisConnectionProvider {
        RedisConnectionProvider::new().with_database(target.database_id.clone(), target.url.clone())
    }

    /// Connect to the resolved target
    pub async fn client(&self, profile: Option<&str>, db: u32) -> Result<Arc<dyn CommandClient>> {
        let target = self.resolve_target(profile)?;
        let metadata = ClientMetadata::new(target.database_id.clone()).with_db(db);
        Ok(self.provider(&target).get_client(&metadata).await?)
    }

    /// Orchestrator for the resolved target, configured from `[workbench]`
    pub fn orchestrator(&self, profile: Option<&str>) -> Result<(ExecutionOrchestrator, Target)> {
        let target = self.resolve_target(profile)?;
        let workbench = &self.config.workbench;

        let router = CommandRouter::new(RouterOptions {
            max_result_size: workbench.max_result_size,
            unsupported: UnsupportedCommands::new(&workbench.unsupported_commands),
        });
        let orchestrator = ExecutionOrchestrator::new(
            Arc::new(self.provider(&target)),
            router,
            Arc::new(InMemoryCommandExecutionStore::new(workbench.executions_limit)),
        )
        .with_max_concurrency(workbench.max_concurrency);

        Ok((orchestrator, target))
    }
}
