//! Connection provider seam
//!
//! Everything in this crate talks to Redis through [`CommandClient`]: a narrow
//! "send this already-formed command" capability. Connection lifecycle, pooling,
//! authentication and TLS belong to whoever implements the trait.

pub mod redis_client;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use redis_client::{RedisConnectionProvider, RedisDatabaseClient};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ReplyError, Result};
use crate::reply;
use crate::topology::ClusterNode;

/// Network address of one Redis node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host:port`, tolerating a cluster bus suffix (`@16379`), an
    /// announced hostname (`,name`) and bracketed IPv6 hosts.
    pub fn parse(address: &str) -> Option<Self> {
        let address = address.split(',').next()?;
        let address = address.split('@').next()?;
        let (host, port) = address.rsplit_once(':')?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return None;
        }
        let port = port.parse().ok()?;
        Some(Self::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A cluster node together with a client bound to it
#[derive(Clone)]
pub struct NodeHandle {
    pub node: ClusterNode,
    pub client: Arc<dyn CommandClient>,
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// Authenticated protocol client for one deployment
#[async_trait]
pub trait CommandClient: Send + Sync {
    /// Address this client is connected to
    fn endpoint(&self) -> Endpoint;

    /// Issue one command and return the raw reply
    async fn send_command(&self, args: &[String]) -> std::result::Result<redis::Value, ReplyError>;

    /// Issue `INFO` and return the free-text reply
    async fn info(&self) -> std::result::Result<String, ReplyError> {
        let value = self.send_command(&["INFO".to_string()]).await?;
        Ok(reply::value_to_text(&value))
    }

    /// Last known cluster topology with one client per node.
    ///
    /// Empty for standalone and sentinel connections.
    fn nodes(&self) -> Vec<NodeHandle> {
        Vec::new()
    }

    /// Whether this client fronts a cluster
    fn is_cluster(&self) -> bool {
        !self.nodes().is_empty()
    }

    /// Reach a node by address, e.g. the target of a redirection
    async fn connect_node(&self, endpoint: &Endpoint) -> Result<Arc<dyn CommandClient>> {
        self.nodes()
            .into_iter()
            .find(|handle| handle.node.endpoint() == *endpoint)
            .map(|handle| handle.client)
            .ok_or_else(|| CoreError::NodeNotFound(endpoint.clone()))
    }
}

/// Identifies which database (and logical db index) a request targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetadata {
    pub database_id: String,
    #[serde(default)]
    pub db: u32,
}

impl ClientMetadata {
    pub fn new(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            db: 0,
        }
    }

    pub fn with_db(mut self, db: u32) -> Self {
        self.db = db;
        self
    }
}

/// Supplies clients for a database
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn get_client(&self, metadata: &ClientMetadata) -> Result<Arc<dyn CommandClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        assert_eq!(
            Endpoint::parse("127.0.0.1:7000"),
            Some(Endpoint::new("127.0.0.1", 7000))
        );
        assert_eq!(
            Endpoint::parse("127.0.0.1:7000@17000"),
            Some(Endpoint::new("127.0.0.1", 7000))
        );
        assert_eq!(
            Endpoint::parse("10.0.0.5:6379@16379,redis-0.local"),
            Some(Endpoint::new("10.0.0.5", 6379))
        );
        assert_eq!(
            Endpoint::parse("[::1]:6379"),
            Some(Endpoint::new("::1", 6379))
        );
    }

    #[test]
    fn test_endpoint_parse_rejects_garbage() {
        assert_eq!(Endpoint::parse("localhost"), None);
        assert_eq!(Endpoint::parse(":6379"), None);
        assert_eq!(Endpoint::parse("host:port"), None);
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("localhost", 6379).to_string(), "localhost:6379");
    }
}
