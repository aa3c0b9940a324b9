//! Deployment topology and capability discovery

pub mod models;
pub mod modules;
pub mod probe;
pub mod prober;
pub mod sentinel;

pub use models::{
    ClusterNode, DeploymentTopology, ModuleDescriptor, NodeRole, SentinelMasterGroup,
    SentinelMasterStatus,
};
pub use modules::RedisModule;
pub use probe::Probe;
pub use prober::{
    determine_cluster_nodes, determine_database_modules, determine_topology,
    get_database_count_from_keyspace, get_databases_count, is_cluster, is_sentinel,
    parse_cluster_nodes,
};
pub use sentinel::{determine_sentinel_master_groups, get_master_endpoints};
