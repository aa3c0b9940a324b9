//! Scripted in-memory client for tests
//!
//! Replies are keyed by the command line, uppercased and space-joined, so
//! `.on("cluster info", ..)` matches `["CLUSTER", "INFO"]` and `["cluster", "info"]`.
//! Unscripted commands answer with an "unknown command" error, which is exactly
//! how a server without the feature responds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis::Value;

use super::{ClientMetadata, CommandClient, ConnectionProvider, Endpoint, NodeHandle};
use crate::error::{CoreError, ReplyError, Result};
use crate::topology::{ClusterNode, NodeRole};

type Reply = std::result::Result<Value, ReplyError>;

/// Scripted client
pub struct FakeClient {
    endpoint: Endpoint,
    replies: HashMap<String, Reply>,
    info: Option<String>,
    nodes: Vec<NodeHandle>,
    extra: Vec<(Endpoint, Arc<dyn CommandClient>)>,
    latency: Option<Duration>,
    calls: Mutex<Vec<Vec<String>>>,
}

fn key(line: &str) -> String {
    line.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Bulk string reply
pub fn bulk(s: &str) -> Value {
    Value::BulkString(s.as_bytes().to_vec())
}

/// Array of bulk strings
pub fn bulk_array(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| bulk(s)).collect())
}

impl FakeClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            endpoint: Endpoint::new(host, port),
            replies: HashMap::new(),
            info: None,
            nodes: Vec::new(),
            extra: Vec::new(),
            latency: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Delay every reply by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer `line` with `value`
    pub fn on(mut self, line: &str, value: Value) -> Self {
        self.replies.insert(key(line), Ok(value));
        self
    }

    /// Answer `line` with an error reply
    pub fn on_error(mut self, line: &str, code: &str, message: &str) -> Self {
        self.replies
            .insert(key(line), Err(ReplyError::server(code, message)));
        self
    }

    /// Answer `line` with a connection failure
    pub fn on_disconnect(mut self, line: &str) -> Self {
        self.replies.insert(
            key(line),
            Err(ReplyError::Connection("connection reset by peer".to_string())),
        );
        self
    }

    /// Free-text `INFO` reply
    pub fn with_info(mut self, info: &str) -> Self {
        self.info = Some(info.to_string());
        self
    }

    /// Register a cluster node
    pub fn with_node(mut self, role: NodeRole, client: Arc<FakeClient>) -> Self {
        let endpoint = client.endpoint();
        let node = ClusterNode {
            id: format!("node-{}", endpoint.port),
            host: endpoint.host,
            port: endpoint.port,
            role,
            slots: Vec::new(),
        };
        let client: Arc<dyn CommandClient> = client;
        self.nodes.push(NodeHandle { node, client });
        self
    }

    /// Register a node that is reachable but not part of `nodes()`
    pub fn with_reachable(mut self, client: Arc<FakeClient>) -> Self {
        let endpoint = client.endpoint();
        let client: Arc<dyn CommandClient> = client;
        self.extra.push((endpoint, client));
        self
    }

    /// Every command line this client received, uppercased
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|args| key(&args.join(" "))).collect())
            .unwrap_or_default()
    }

    /// Number of commands this client received
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CommandClient for FakeClient {
    fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    async fn send_command(&self, args: &[String]) -> Reply {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args.to_vec());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let line = key(&args.join(" "));
        if line == "INFO" {
            if let Some(info) = &self.info {
                return Ok(bulk(info));
            }
        }
        match self.replies.get(&line) {
            Some(reply) => reply.clone(),
            None => Err(ReplyError::server(
                "ERR",
                format!(
                    "unknown command '{}', with args beginning with: ",
                    args.first().map(String::as_str).unwrap_or_default()
                ),
            )),
        }
    }

    fn nodes(&self) -> Vec<NodeHandle> {
        self.nodes.clone()
    }

    async fn connect_node(&self, endpoint: &Endpoint) -> Result<Arc<dyn CommandClient>> {
        if let Some(handle) = self.nodes.iter().find(|h| h.node.endpoint() == *endpoint) {
            return Ok(handle.client.clone());
        }
        self.extra
            .iter()
            .find(|(e, _)| e == endpoint)
            .map(|(_, client)| client.clone())
            .ok_or_else(|| CoreError::NodeNotFound(endpoint.clone()))
    }
}

/// Provider that hands out one fixed client for every database
pub struct FakeProvider {
    client: Arc<dyn CommandClient>,
    requests: Mutex<Vec<ClientMetadata>>,
}

impl FakeProvider {
    pub fn new(client: Arc<FakeClient>) -> Self {
        let client: Arc<dyn CommandClient> = client;
        Self {
            client,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Metadata of every `get_client` call
    pub fn requests(&self) -> Vec<ClientMetadata> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConnectionProvider for FakeProvider {
    async fn get_client(&self, metadata: &ClientMetadata) -> Result<Arc<dyn CommandClient>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(metadata.clone());
        }
        Ok(self.client.clone())
    }
}
