//! [`CommandClient`] implementation on top of the `redis` crate

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use redis::aio::MultiplexedConnection;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisError, Value};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use super::{ClientMetadata, CommandClient, ConnectionProvider, Endpoint, NodeHandle};
use crate::config::{Config, ConfigError};
use crate::error::{CoreError, ReplyError, Result};
use crate::topology::{determine_cluster_nodes, is_cluster};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

impl From<RedisError> for ReplyError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            return ReplyError::Connection(err.to_string());
        }
        match (err.code(), err.detail()) {
            (Some(code), Some(detail)) => ReplyError::server(code, detail),
            (Some(code), None) => ReplyError::server(code, ""),
            _ => ReplyError::server("ERR", err.to_string()),
        }
    }
}

impl From<RedisError> for CoreError {
    fn from(err: RedisError) -> Self {
        CoreError::Reply(err.into())
    }
}

enum Connection {
    Single(MultiplexedConnection),
    Cluster(ClusterConnection),
}

/// Client for one Redis deployment
///
/// Standalone and sentinel endpoints get one multiplexed connection. Cluster
/// entry points additionally get a cluster connection for key-routed commands
/// and one multiplexed connection per node for node-targeted commands.
pub struct RedisDatabaseClient {
    endpoint: Endpoint,
    info: ConnectionInfo,
    connection: Connection,
    nodes: Vec<NodeHandle>,
}

fn endpoint_of(addr: &ConnectionAddr) -> Endpoint {
    match addr {
        ConnectionAddr::Tcp(host, port) => Endpoint::new(host.clone(), *port),
        ConnectionAddr::TcpTls { host, port, .. } => Endpoint::new(host.clone(), *port),
        _ => Endpoint::new("localhost", 0),
    }
}

/// Same credentials and TLS settings as `base`, pointed at `endpoint`
fn info_for(base: &ConnectionInfo, endpoint: &Endpoint) -> ConnectionInfo {
    let addr = match &base.addr {
        ConnectionAddr::TcpTls { .. } => {
            let mut addr = base.addr.clone();
            if let ConnectionAddr::TcpTls { host, port, .. } = &mut addr {
                *host = endpoint.host.clone();
                *port = endpoint.port;
            }
            addr
        }
        _ => ConnectionAddr::Tcp(endpoint.host.clone(), endpoint.port),
    };
    let mut info = base.clone();
    info.addr = addr;
    info
}

async fn open_single(info: ConnectionInfo) -> Result<MultiplexedConnection> {
    let endpoint = endpoint_of(&info.addr);
    let client = redis::Client::open(info)?;
    match tokio::time::timeout(CONNECT_TIMEOUT, client.get_multiplexed_async_connection()).await {
        Ok(connection) => Ok(connection?),
        Err(_) => Err(ReplyError::Connection(format!(
            "Timed out connecting to {}",
            endpoint
        ))
        .into()),
    }
}

impl RedisDatabaseClient {
    /// Connect to `url`, discovering cluster nodes when the endpoint is a cluster member
    pub async fn connect(url: &str) -> Result<Self> {
        let info = url.into_connection_info()?;
        Self::connect_with_info(info).await
    }

    /// Connect using an already parsed [`ConnectionInfo`]
    pub async fn connect_with_info(info: ConnectionInfo) -> Result<Self> {
        let endpoint = endpoint_of(&info.addr);
        let single = Self::single(info.clone()).await?;

        if !is_cluster(&single).await {
            info!(endpoint = %endpoint, "Connected to non-cluster endpoint");
            return Ok(single);
        }

        let topology = determine_cluster_nodes(&single).await?;
        let nodes = try_join_all(topology.into_iter().map(|node| {
            let node_info = info_for(&info, &node.endpoint());
            async move {
                let client = Self::single(node_info).await?;
                let client: Arc<dyn CommandClient> = Arc::new(client);
                Ok::<_, CoreError>(NodeHandle { node, client })
            }
        }))
        .await?;

        let cluster = ClusterClient::new(vec![info.clone()])?;
        let connection = cluster.get_async_connection().await?;

        info!(endpoint = %endpoint, nodes = nodes.len(), "Connected to cluster");
        Ok(Self {
            endpoint,
            info,
            connection: Connection::Cluster(connection),
            nodes,
        })
    }

    async fn single(info: ConnectionInfo) -> Result<Self> {
        let endpoint = endpoint_of(&info.addr);
        let connection = open_single(info.clone()).await?;
        debug!(endpoint = %endpoint, "Opened connection");
        Ok(Self {
            endpoint,
            info,
            connection: Connection::Single(connection),
            nodes: Vec::new(),
        })
    }
}

#[async_trait]
impl CommandClient for RedisDatabaseClient {
    fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    async fn send_command(&self, args: &[String]) -> std::result::Result<Value, ReplyError> {
        let Some((name, rest)) = args.split_first() else {
            return Err(ReplyError::server("ERR", "empty command"));
        };
        let mut cmd = redis::cmd(name);
        for arg in rest {
            cmd.arg(arg);
        }

        let reply = match &self.connection {
            Connection::Single(connection) => {
                let mut connection = connection.clone();
                cmd.query_async::<Value>(&mut connection).await
            }
            Connection::Cluster(connection) => {
                let mut connection = connection.clone();
                cmd.query_async::<Value>(&mut connection).await
            }
        };
        tracing::trace!(command = %name, reply = ?reply, "Raw reply");
        Ok(reply?)
    }

    fn nodes(&self) -> Vec<NodeHandle> {
        self.nodes.clone()
    }

    async fn connect_node(&self, endpoint: &Endpoint) -> Result<Arc<dyn CommandClient>> {
        if let Some(handle) = self.nodes.iter().find(|h| h.node.endpoint() == *endpoint) {
            return Ok(handle.client.clone());
        }
        debug!(node = %endpoint, "Connecting to node outside the known topology");
        let client = Self::single(info_for(&self.info, endpoint)).await?;
        Ok(Arc::new(client))
    }
}

type CacheKey = (String, u32);

/// Clients keyed by database id and logical db.
///
/// The map lock is only held to find a key's cell; connecting happens on the
/// cell, so a slow connect only holds up callers of the same key. A failed
/// connect leaves the cell empty for the next caller.
struct ClientCache<T> {
    cells: Mutex<HashMap<CacheKey, Arc<OnceCell<Arc<T>>>>>,
}

impl<T> ClientCache<T> {
    fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    async fn get_or_connect<F, Fut>(&self, key: CacheKey, connect: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cell = self.cells.lock().await.entry(key).or_default().clone();
        cell.get_or_try_init(|| async move { connect().await.map(Arc::new) })
            .await
            .cloned()
    }
}

/// Hands out one cached client per database id and logical db
pub struct RedisConnectionProvider {
    urls: HashMap<String, String>,
    clients: ClientCache<RedisDatabaseClient>,
}

impl Default for RedisConnectionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RedisConnectionProvider {
    pub fn new() -> Self {
        Self {
            urls: HashMap::new(),
            clients: ClientCache::new(),
        }
    }

    /// Register `url` under `database_id`
    pub fn with_database(mut self, database_id: impl Into<String>, url: impl Into<String>) -> Self {
        self.urls.insert(database_id.into(), url.into());
        self
    }

    /// One database per configured profile
    pub fn from_config(config: &Config) -> Self {
        config
            .list_profiles()
            .into_iter()
            .fold(Self::new(), |provider, (name, profile)| {
                provider.with_database(profile.database_id(name), profile.url.clone())
            })
    }
}

#[async_trait]
impl ConnectionProvider for RedisConnectionProvider {
    async fn get_client(&self, metadata: &ClientMetadata) -> Result<Arc<dyn CommandClient>> {
        let url = self.urls.get(&metadata.database_id).ok_or_else(|| {
            CoreError::Config(ConfigError::UnknownDatabase {
                database_id: metadata.database_id.clone(),
            })
        })?;

        let key = (metadata.database_id.clone(), metadata.db);
        let db = metadata.db;
        let client = self
            .clients
            .get_or_connect(key, || async move {
                let mut info = url.as_str().into_connection_info()?;
                if db != 0 {
                    info.redis.db = i64::from(db);
                }
                RedisDatabaseClient::connect_with_info(info).await
            })
            .await?;
        let client: Arc<dyn CommandClient> = client;
        Ok(client)
    }
}
