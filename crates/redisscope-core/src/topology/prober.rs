//! Best-effort deployment probing
//!
//! Capability probes (`is_cluster`, `is_sentinel`, module and database count
//! detection) never fail: a missing or denied feature turns into a negative
//! answer. Enumeration calls made once the capability is assumed
//! (`determine_cluster_nodes`, sentinel discovery) propagate errors instead.

use std::collections::BTreeMap;

use futures::future::join_all;
use redis::Value;
use tracing::{debug, info, trace};

use super::models::{ClusterNode, DeploymentTopology, ModuleDescriptor, NodeRole};
use super::modules::{RedisModule, semantic_version};
use super::probe::Probe;
use super::sentinel::determine_sentinel_master_groups;
use crate::client::{CommandClient, Endpoint};
use crate::error::Result;
use crate::reply::{pair_field, value_as_array, value_as_i64, value_as_pairs, value_as_str, value_to_text};

pub(crate) fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Whether the connection fronts a cluster with cluster support enabled.
///
/// Any protocol error, including "cluster support disabled", answers `false`.
pub async fn is_cluster(client: &dyn CommandClient) -> bool {
    let probe = Probe::from_reply(client.send_command(&args(&["CLUSTER", "INFO"])).await);
    probe
        .map(|reply| {
            let text = value_to_text(&reply);
            trace!(reply = %text, "CLUSTER INFO");
            cluster_state_ok(&text)
        })
        .or_default_logged("cluster", false)
}

fn cluster_state_ok(cluster_info: &str) -> bool {
    cluster_info
        .lines()
        .filter_map(|line| line.trim().split_once(':'))
        .any(|(key, value)| key == "cluster_state" && value == "ok")
}

/// Whether the connection points at a sentinel
pub async fn is_sentinel(client: &dyn CommandClient) -> bool {
    Probe::from_reply(
        client
            .send_command(&args(&["SENTINEL", "MASTERS"]))
            .await,
    )
    .map(|_| true)
    .or_default_logged("sentinel", false)
}

/// Enumerate cluster nodes from `CLUSTER NODES`.
///
/// Errors propagate: callers only get here after deciding the deployment is a
/// cluster, so a blocked enumeration must be loud.
pub async fn determine_cluster_nodes(client: &dyn CommandClient) -> Result<Vec<ClusterNode>> {
    let reply = client
        .send_command(&args(&["CLUSTER", "NODES"]))
        .await?;
    let nodes = parse_cluster_nodes(&value_to_text(&reply));
    debug!(count = nodes.len(), "Discovered cluster nodes");
    Ok(nodes)
}

/// Parse a `CLUSTER NODES` reply.
///
/// Format: `<id> <ip:port@cport[,hostname]> <flags> <master> <ping-sent> <pong-recv> <config-epoch> <link-state> <slot> ...`
pub fn parse_cluster_nodes(reply: &str) -> Vec<ClusterNode> {
    reply.lines().filter_map(parse_cluster_node_line).collect()
}

fn parse_cluster_node_line(line: &str) -> Option<ClusterNode> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }

    let flags: Vec<&str> = parts[2].split(',').collect();
    if flags.contains(&"noaddr") {
        return None;
    }

    let endpoint = Endpoint::parse(parts[1])?;
    if endpoint.port == 0 {
        return None;
    }

    let role = if flags.contains(&"master") {
        NodeRole::Master
    } else if flags.contains(&"slave") || flags.contains(&"replica") {
        NodeRole::Replica
    } else {
        return None;
    };

    let slots = parts
        .iter()
        .skip(8)
        .filter(|s| !s.starts_with('['))
        .map(|s| s.to_string())
        .collect();

    Some(ClusterNode {
        id: parts[0].to_string(),
        host: endpoint.host,
        port: endpoint.port,
        role,
        slots,
    })
}

/// Number of logical databases from `CONFIG GET databases`, `1` when unknown
pub async fn get_databases_count(client: &dyn CommandClient) -> u32 {
    probe_databases_count(client)
        .await
        .map(|count| count.unwrap_or(1))
        .or_default_logged("databases", 1)
}

/// `CONFIG GET databases` keeping the reason it might have failed
pub(crate) async fn probe_databases_count(client: &dyn CommandClient) -> Probe<Option<u32>> {
    Probe::from_reply(
        client
            .send_command(&args(&["CONFIG", "GET", "databases"]))
            .await,
    )
    .map(|reply| {
        pair_field(&value_as_pairs(&reply), "databases")
            .and_then(|v| value_as_i64(&v))
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
    })
}

/// Database count implied by the keyspace section: highest `db<N>` plus one.
///
/// Used when `CONFIG GET` is restricted.
pub fn get_database_count_from_keyspace(keyspace: Option<&BTreeMap<String, String>>) -> u32 {
    keyspace
        .into_iter()
        .flat_map(|map| map.keys())
        .filter_map(|key| key.strip_prefix("db")?.parse::<u32>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(1)
}

/// Detect loaded modules. Best-effort: never fails, may return an empty list.
pub async fn determine_database_modules(client: &dyn CommandClient) -> Vec<ModuleDescriptor> {
    let probe = Probe::from_reply(client.send_command(&args(&["MODULE", "LIST"])).await);
    match probe {
        Probe::Supported(reply) => parse_module_list(&reply),
        other => {
            if let Some(e) = other.error() {
                debug!(error = %e, "MODULE LIST unavailable, probing signature commands");
            }
            detect_modules_by_commands(client).await
        }
    }
}

fn parse_module_list(reply: &Value) -> Vec<ModuleDescriptor> {
    value_as_array(reply)
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| {
            let pairs = value_as_pairs(entry);
            let raw_name = pair_field(&pairs, "name").and_then(|v| value_as_str(&v))?;
            let version = pair_field(&pairs, "ver").and_then(|v| value_as_i64(&v));
            Some(match RedisModule::from_raw_name(&raw_name) {
                Some(module) => ModuleDescriptor {
                    name: module.as_str().to_string(),
                    version,
                    semantic_version: version.and_then(semantic_version),
                },
                None => ModuleDescriptor {
                    name: raw_name,
                    version,
                    semantic_version: None,
                },
            })
        })
        .collect()
}

async fn detect_modules_by_commands(client: &dyn CommandClient) -> Vec<ModuleDescriptor> {
    let probes = RedisModule::ALL.into_iter().map(|module| async move {
        let reply = client
            .send_command(&args(&["COMMAND", "INFO", module.signature_command()]))
            .await;
        let present = Probe::from_reply(reply)
            .map(|reply| {
                value_as_array(&reply)
                    .is_some_and(|items| items.iter().any(|item| !matches!(item, Value::Nil)))
            })
            .or_default_logged("command-info", false);
        present.then(|| ModuleDescriptor::bare(module.as_str()))
    });

    join_all(probes).await.into_iter().flatten().collect()
}

/// Classify the deployment behind `client`
pub async fn determine_topology(client: &dyn CommandClient) -> Result<DeploymentTopology> {
    let topology = if is_cluster(client).await {
        DeploymentTopology::Cluster {
            nodes: determine_cluster_nodes(client).await?,
        }
    } else if is_sentinel(client).await {
        DeploymentTopology::Sentinel {
            groups: determine_sentinel_master_groups(client).await?,
        }
    } else {
        DeploymentTopology::Standalone
    };

    info!(endpoint = %client.endpoint(), kind = topology_kind(&topology), "Determined topology");
    Ok(topology)
}

fn topology_kind(topology: &DeploymentTopology) -> &'static str {
    match topology {
        DeploymentTopology::Standalone => "standalone",
        DeploymentTopology::Cluster { .. } => "cluster",
        DeploymentTopology::Sentinel { .. } => "sentinel",
    }
}
