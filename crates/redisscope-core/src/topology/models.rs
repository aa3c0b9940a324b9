//! Topology data model

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::Endpoint;

/// Role of a cluster node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Master,
    Replica,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Master => write!(f, "master"),
            NodeRole::Replica => write!(f, "replica"),
        }
    }
}

/// One node from `CLUSTER NODES`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub role: NodeRole,
    /// Raw slot tokens (`0-5460`, `5461`); empty for replicas
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<String>,
}

impl ClusterNode {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// First slot range served by this node
    pub fn slot_range(&self) -> Option<&str> {
        self.slots.first().map(String::as_str)
    }
}

/// Health of a sentinel-monitored master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentinelMasterStatus {
    Active,
    Inactive,
}

/// A master group as reported by `SENTINEL MASTERS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentinelMasterGroup {
    pub name: String,
    /// Address of the monitored master itself
    pub host: String,
    pub port: u16,
    pub status: SentinelMasterStatus,
    /// The probing sentinel followed by every companion sentinel for this master
    pub endpoints: Vec<Endpoint>,
    pub number_of_replicas: u32,
}

/// Deployment shape of the target store. Recomputed per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeploymentTopology {
    Standalone,
    Cluster { nodes: Vec<ClusterNode> },
    Sentinel { groups: Vec<SentinelMasterGroup> },
}

/// An optional server module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_version: Option<String>,
}

impl ModuleDescriptor {
    /// Descriptor without version information
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            semantic_version: None,
        }
    }
}
