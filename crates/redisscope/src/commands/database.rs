//! `probe` and `info` commands

use redisscope_core::Endpoint;
use redisscope_core::topology::{
    DeploymentTopology, ModuleDescriptor, determine_database_modules, determine_topology,
    get_databases_count,
};
use redisscope_core::info::get_general_info;
use serde::Serialize;
use tracing::debug;

use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::output::{OutputFormat, print_output};

/// Everything `probe` found out about a deployment
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub endpoint: Endpoint,
    pub topology: DeploymentTopology,
    pub modules: Vec<ModuleDescriptor>,
    pub databases: u32,
}

pub async fn handle_probe(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let client = conn_mgr.client(profile, 0).await?;
    let topology = determine_topology(client.as_ref()).await?;
    let (modules, databases) = tokio::join!(
        determine_database_modules(client.as_ref()),
        get_databases_count(client.as_ref())
    );
    debug!(modules = modules.len(), databases, "Probe complete");

    let report = ProbeReport {
        endpoint: client.endpoint(),
        topology,
        modules,
        databases,
    };
    print_output(&report, output)?;
    Ok(())
}

pub async fn handle_info(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let client = conn_mgr.client(profile, 0).await?;
    let stats = get_general_info(client.as_ref()).await?;
    print_output(&stats, output)?;
    Ok(())
}
