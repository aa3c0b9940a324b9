//! Structured server statistics
//!
//! Fields missing from the `INFO` reply stay `None` so "not reported" never
//! reads as zero.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parser::{InfoReply, parse_info};
use crate::client::CommandClient;
use crate::error::{CoreError, Result};
use crate::topology::get_database_count_from_keyspace;
use crate::topology::probe::Probe;
use crate::topology::prober::probe_databases_count;

/// Statistics of one node, or of a whole cluster when `nodes` is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub databases: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_memory: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_keys: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_clients: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_in_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_scripts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<DatabaseStats>>,
    #[serde(skip)]
    keyspace_hits: Option<u64>,
    #[serde(skip)]
    keyspace_misses: Option<u64>,
}

fn number(info: &InfoReply, key: &str) -> Option<u64> {
    info.find(key)?.trim().parse().ok()
}

fn hit_ratio(hits: Option<u64>, misses: Option<u64>) -> Option<f64> {
    let (hits, misses) = (hits?, misses?);
    let total = hits + misses;
    (total > 0).then(|| hits as f64 / total as f64)
}

/// Sum the reported values; `None` when no one reported
fn sum_reported(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    values.flatten().reduce(|a, b| a + b)
}

impl DatabaseStats {
    /// Build statistics from a parsed `INFO` reply
    pub fn from_info(info: &InfoReply) -> Result<Self> {
        let version = info
            .find("redis_version")
            .ok_or_else(|| CoreError::Parse("INFO reply carries no redis_version".to_string()))?
            .to_string();

        let keyspace = info.keyspace();
        let total_keys = if info.section("keyspace").is_some() {
            Some(keyspace.values().filter_map(|entry| entry.keys).sum())
        } else {
            None
        };

        let keyspace_hits = number(info, "keyspace_hits");
        let keyspace_misses = number(info, "keyspace_misses");

        Ok(DatabaseStats {
            version,
            role: info.find("role").map(str::to_string),
            mode: info.find("redis_mode").map(str::to_string),
            databases: None,
            used_memory: number(info, "used_memory"),
            total_keys,
            connected_clients: number(info, "connected_clients"),
            uptime_in_seconds: number(info, "uptime_in_seconds"),
            hit_ratio: hit_ratio(keyspace_hits, keyspace_misses),
            cached_scripts: number(info, "number_of_cached_scripts"),
            server: info.section("server").cloned(),
            nodes: None,
            keyspace_hits,
            keyspace_misses,
        })
    }

    /// Combine per-node statistics into one cluster summary
    pub fn aggregate(nodes: Vec<DatabaseStats>) -> Result<Self> {
        let first = nodes
            .first()
            .ok_or_else(|| CoreError::NoTargetNodes("cluster has no nodes".to_string()))?;

        let keyspace_hits = sum_reported(nodes.iter().map(|n| n.keyspace_hits));
        let keyspace_misses = sum_reported(nodes.iter().map(|n| n.keyspace_misses));

        Ok(DatabaseStats {
            version: first.version.clone(),
            role: None,
            mode: first.mode.clone(),
            databases: Some(1),
            used_memory: sum_reported(nodes.iter().map(|n| n.used_memory)),
            total_keys: sum_reported(nodes.iter().map(|n| n.total_keys)),
            connected_clients: sum_reported(nodes.iter().map(|n| n.connected_clients)),
            uptime_in_seconds: nodes.iter().filter_map(|n| n.uptime_in_seconds).max(),
            hit_ratio: hit_ratio(keyspace_hits, keyspace_misses),
            cached_scripts: None,
            server: first.server.clone(),
            keyspace_hits,
            keyspace_misses,
            nodes: Some(nodes),
        })
    }
}

/// Statistics of one node from its own `INFO`
async fn node_stats(client: &dyn CommandClient) -> Result<DatabaseStats> {
    let reply = client.info().await?;
    DatabaseStats::from_info(&parse_info(&reply))
}

/// General statistics for the deployment behind `client`.
///
/// For a cluster every node is queried and the result is an aggregate with
/// per-node statistics in `nodes`.
pub async fn get_general_info(client: &dyn CommandClient) -> Result<DatabaseStats> {
    let handles = client.nodes();
    if !handles.is_empty() {
        debug!(nodes = handles.len(), "Collecting cluster node statistics");
        let nodes = try_join_all(handles.iter().map(|h| node_stats(h.client.as_ref()))).await?;
        return DatabaseStats::aggregate(nodes);
    }

    let reply = client.info().await?;
    let info = parse_info(&reply);
    let mut stats = DatabaseStats::from_info(&info)?;

    stats.databases = Some(match probe_databases_count(client).await {
        Probe::Supported(Some(count)) => count,
        other => {
            if let Some(e) = other.error() {
                debug!(error = %e, "CONFIG GET databases unavailable, using keyspace");
            }
            get_database_count_from_keyspace(info.section("keyspace"))
        }
    });

    Ok(stats)
}
