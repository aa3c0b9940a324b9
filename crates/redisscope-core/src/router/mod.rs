//! Route one submitted command to the right node(s)
//!
//! Each command goes through: resolve targets, pre-flight check, dispatch,
//! classify. Nodes are dispatched concurrently and independently; one node
//! failing never stops the others. Resolving no target at all is an error.

pub mod parser;
pub mod unsupported;

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use crate::client::{CommandClient, Endpoint};
use crate::error::{CoreError, ReplyError, ReplyErrorKind, Result};
use crate::execution::models::{
    ClusterNodeRole, CommandExecutionResult, CommandExecutionStatus, NodeOptions, ResultNode,
};
use crate::reply::value_to_json;

pub use parser::split_command_line;
pub use unsupported::{UNSUPPORTED_COMMANDS, UnsupportedCommands};

/// Default response size limit in bytes
pub const DEFAULT_MAX_RESULT_SIZE: usize = 1024 * 1024;

/// Stored in place of a response larger than the limit
pub const SIZE_LIMIT_EXCEEDED_MESSAGE: &str =
    "Results have been truncated because they exceed the size limit";

/// Router settings
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Responses whose JSON encoding exceeds this many bytes are not stored
    pub max_result_size: usize,
    pub unsupported: UnsupportedCommands,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_result_size: DEFAULT_MAX_RESULT_SIZE,
            unsupported: UnsupportedCommands::default(),
        }
    }
}

/// Routing context for one command
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteRequest<'a> {
    pub role: Option<ClusterNodeRole>,
    pub node_options: Option<&'a NodeOptions>,
}

enum Target<'a> {
    /// The connection itself; clusters route by key on their own
    Entry(&'a dyn CommandClient),
    /// One specific node
    Node(Endpoint, Arc<dyn CommandClient>),
}

impl Target<'_> {
    fn client(&self) -> &dyn CommandClient {
        match self {
            Target::Entry(client) => *client,
            Target::Node(_, client) => client.as_ref(),
        }
    }

    fn node(&self) -> Option<ResultNode> {
        match self {
            Target::Entry(_) => None,
            Target::Node(endpoint, _) => Some(endpoint.clone().into()),
        }
    }
}

/// Dispatches commands against a client
#[derive(Debug, Clone, Default)]
pub struct CommandRouter {
    options: RouterOptions,
}

impl CommandRouter {
    pub fn new(options: RouterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Run `command` and return one result per targeted node
    pub async fn execute(
        &self,
        client: &dyn CommandClient,
        command: &str,
        request: RouteRequest<'_>,
    ) -> Result<Vec<CommandExecutionResult>> {
        let args = split_command_line(command)?;
        if args.is_empty() {
            return Err(CoreError::Validation("Command must not be empty".to_string()));
        }

        let targets = resolve_targets(client, request)?;

        if let Some(denied) = self.options.unsupported.check(&args) {
            debug!(command = %denied, "Rejected unsupported command");
            return Ok(vec![CommandExecutionResult::fail(
                self.options.unsupported.message(&denied),
            )]);
        }
        let redirect = request
            .node_options
            .is_some_and(|options| options.enable_redirection);

        info!(
            command = %args[0],
            targets = targets.len(),
            redirect,
            "Dispatching command"
        );

        let results = join_all(
            targets
                .iter()
                .map(|target| self.dispatch(client, target, &args, redirect)),
        )
        .await;

        Ok(results)
    }

    async fn dispatch(
        &self,
        entry: &dyn CommandClient,
        target: &Target<'_>,
        args: &[String],
        redirect: bool,
    ) -> CommandExecutionResult {
        let reply = target.client().send_command(args).await;

        if let (true, Target::Node(..), Err(err)) = (redirect, target, &reply) {
            if let ReplyErrorKind::Moved { slot, endpoint } = err.kind() {
                return self.redirect(entry, slot, endpoint, args).await;
            }
        }

        let result = self.classify(reply);
        match target.node() {
            Some(node) => result.with_node(node),
            None => result,
        }
    }

    /// One hop to the node named by a MOVED reply. Never recursive.
    async fn redirect(
        &self,
        entry: &dyn CommandClient,
        slot: u16,
        endpoint: Endpoint,
        args: &[String],
    ) -> CommandExecutionResult {
        debug!(slot, node = %endpoint, "Following MOVED redirection");
        let node = ResultNode {
            host: endpoint.host.clone(),
            port: endpoint.port,
            slot: Some(slot),
        };

        let reply = match entry.connect_node(&endpoint).await {
            Ok(client) => client.send_command(args).await,
            Err(err) => Err(ReplyError::Connection(err.to_string())),
        };
        self.classify(reply).with_node(node)
    }

    fn classify(&self, reply: std::result::Result<redis::Value, ReplyError>) -> CommandExecutionResult {
        let mut result = match reply {
            Ok(value) => CommandExecutionResult::success(value_to_json(&value)),
            Err(err) => CommandExecutionResult::fail(err.to_string()),
        };

        if result.status == CommandExecutionStatus::Success {
            let size = serde_json::to_string(&result.response)
                .map(|s| s.len())
                .unwrap_or(0);
            if size > self.options.max_result_size {
                debug!(size, limit = self.options.max_result_size, "Response exceeds size limit");
                result.response = serde_json::Value::String(SIZE_LIMIT_EXCEEDED_MESSAGE.to_string());
                result.size_limit_exceeded = Some(true);
            }
        }
        result
    }
}

fn resolve_targets<'a>(
    client: &'a dyn CommandClient,
    request: RouteRequest<'_>,
) -> Result<Vec<Target<'a>>> {
    let nodes = client.nodes();

    if let Some(options) = request.node_options {
        let wanted = options.endpoint();
        if nodes.is_empty() {
            return if client.endpoint() == wanted {
                Ok(vec![Target::Entry(client)])
            } else {
                Err(CoreError::NodeNotFound(wanted))
            };
        }
        return nodes
            .into_iter()
            .find(|handle| handle.node.endpoint() == wanted)
            .map(|handle| vec![Target::Node(wanted.clone(), handle.client)])
            .ok_or(CoreError::NodeNotFound(wanted));
    }

    match request.role {
        Some(role) if !nodes.is_empty() => {
            let targets: Vec<Target<'a>> = nodes
                .into_iter()
                .filter(|handle| role.matches(handle.node.role))
                .map(|handle| Target::Node(handle.node.endpoint(), handle.client))
                .collect();
            if targets.is_empty() {
                return Err(CoreError::NoTargetNodes(format!(
                    "no cluster node matches role {}",
                    role
                )));
            }
            Ok(targets)
        }
        _ => Ok(vec![Target::Entry(client)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{FakeClient, bulk};
    use crate::topology::NodeRole;
    use pretty_assertions::assert_eq;

    fn cluster() -> (FakeClient, Arc<FakeClient>, Arc<FakeClient>, Arc<FakeClient>) {
        let m1 = Arc::new(
            FakeClient::new("127.0.0.1", 7001)
                .on("get foo", bulk("bar"))
                .on_error("get other", "MOVED", "1000 127.0.0.1:7002"),
        );
        let m2 = Arc::new(
            FakeClient::new("127.0.0.1", 7002)
                .on("get foo", bulk("bar2"))
                .on("get other", bulk("found")),
        );
        let r1 = Arc::new(FakeClient::new("127.0.0.1", 7003).on_error(
            "get foo",
            "MOVED",
            "12182 127.0.0.1:7001",
        ));
        let entry = FakeClient::new("127.0.0.1", 7001)
            .on("get foo", bulk("routed"))
            .with_node(NodeRole::Master, m1.clone())
            .with_node(NodeRole::Master, m2.clone())
            .with_node(NodeRole::Replica, r1.clone());
        (entry, m1, m2, r1)
    }

    fn node(host: &str, port: u16, redirect: bool) -> NodeOptions {
        NodeOptions {
            host: host.to_string(),
            port,
            enable_redirection: redirect,
        }
    }

    #[tokio::test]
    async fn test_standalone() {
        let client = FakeClient::new("localhost", 6379).on("set foo bar", redis::Value::Okay);
        let results = CommandRouter::default()
            .execute(&client, "set foo bar", RouteRequest::default())
            .await
            .unwrap();
        assert_eq!(results, vec![CommandExecutionResult::success(serde_json::json!("OK"))]);
    }

    #[tokio::test]
    async fn test_unsupported_never_dispatched() {
        let client = FakeClient::new("localhost", 6379);
        let results = CommandRouter::default()
            .execute(&client, "subscribe news", RouteRequest::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CommandExecutionStatus::Fail);
        assert!(results[0].response.as_str().unwrap().contains("SUBSCRIBE"));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_and_malformed_commands() {
        let client = FakeClient::new("localhost", 6379);
        let router = CommandRouter::default();
        assert!(matches!(
            router.execute(&client, "   ", RouteRequest::default()).await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            router.execute(&client, "get \"foo", RouteRequest::default()).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_fail_result() {
        let client = FakeClient::new("localhost", 6379).on_error("incr foo", "ERR", "value is not an integer or out of range");
        let results = CommandRouter::default()
            .execute(&client, "incr foo", RouteRequest::default())
            .await
            .unwrap();
        assert_eq!(results[0].status, CommandExecutionStatus::Fail);
        assert_eq!(
            results[0].response,
            serde_json::json!("ERR value is not an integer or out of range")
        );
    }

    #[tokio::test]
    async fn test_cluster_without_routing_uses_entry() {
        let (entry, m1, ..) = cluster();
        let results = CommandRouter::default()
            .execute(&entry, "get foo", RouteRequest::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].response, serde_json::json!("routed"));
        assert!(results[0].node.is_none());
        assert_eq!(m1.call_count(), 0);
    }

    #[tokio::test]
    async fn test_role_fan_out() {
        let (entry, ..) = cluster();
        let router = CommandRouter::default();

        let masters = router
            .execute(
                &entry,
                "get foo",
                RouteRequest {
                    role: Some(ClusterNodeRole::Master),
                    node_options: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(masters.len(), 2);
        assert_eq!(masters[0].node.as_ref().unwrap().port, 7001);
        assert_eq!(masters[1].response, serde_json::json!("bar2"));

        let all = router
            .execute(
                &entry,
                "get foo",
                RouteRequest {
                    role: Some(ClusterNodeRole::All),
                    node_options: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        // Redirection is only followed for explicit node targets
        assert_eq!(all[2].status, CommandExecutionStatus::Fail);
        assert_eq!(all[0].status, CommandExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_role_without_matches_is_error() {
        let m1 = Arc::new(FakeClient::new("127.0.0.1", 7001));
        let entry = FakeClient::new("127.0.0.1", 7001).with_node(NodeRole::Master, m1);
        let err = CommandRouter::default()
            .execute(
                &entry,
                "get foo",
                RouteRequest {
                    role: Some(ClusterNodeRole::Slave),
                    node_options: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoTargetNodes(_)));
    }

    #[tokio::test]
    async fn test_explicit_node() {
        let (entry, _, m2, _) = cluster();
        let options = node("127.0.0.1", 7002, false);
        let results = CommandRouter::default()
            .execute(
                &entry,
                "get foo",
                RouteRequest {
                    role: None,
                    node_options: Some(&options),
                },
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].response, serde_json::json!("bar2"));
        assert_eq!(
            results[0].node,
            Some(ResultNode {
                host: "127.0.0.1".to_string(),
                port: 7002,
                slot: None,
            })
        );
        assert_eq!(m2.calls(), vec!["GET FOO".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_node_is_error() {
        let (entry, ..) = cluster();
        let options = node("10.9.9.9", 7000, true);
        let err = CommandRouter::default()
            .execute(
                &entry,
                "get foo",
                RouteRequest {
                    role: None,
                    node_options: Some(&options),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound(_)));
    }

    #[tokio::test]
    async fn test_redirection_single_hop() {
        let (entry, m1, m2, _) = cluster();
        let options = node("127.0.0.1", 7001, true);
        let results = CommandRouter::default()
            .execute(
                &entry,
                "get other",
                RouteRequest {
                    role: None,
                    node_options: Some(&options),
                },
            )
            .await
            .unwrap();

        assert_eq!(results[0].status, CommandExecutionStatus::Success);
        assert_eq!(results[0].response, serde_json::json!("found"));
        assert_eq!(
            results[0].node,
            Some(ResultNode {
                host: "127.0.0.1".to_string(),
                port: 7002,
                slot: Some(1000),
            })
        );
        assert_eq!(m1.call_count(), 1);
        assert_eq!(m2.call_count(), 1);
    }

    #[tokio::test]
    async fn test_redirection_disabled() {
        let (entry, _, m2, _) = cluster();
        let options = node("127.0.0.1", 7001, false);
        let results = CommandRouter::default()
            .execute(
                &entry,
                "get other",
                RouteRequest {
                    role: None,
                    node_options: Some(&options),
                },
            )
            .await
            .unwrap();
        assert_eq!(results[0].status, CommandExecutionStatus::Fail);
        assert_eq!(results[0].response, serde_json::json!("MOVED 1000 127.0.0.1:7002"));
        assert_eq!(m2.call_count(), 0);
    }

    #[tokio::test]
    async fn test_redirection_is_not_recursive() {
        let a = Arc::new(FakeClient::new("127.0.0.1", 7001).on_error("get k", "MOVED", "5 127.0.0.1:7002"));
        let b = Arc::new(FakeClient::new("127.0.0.1", 7002).on_error("get k", "MOVED", "5 127.0.0.1:7001"));
        let entry = FakeClient::new("127.0.0.1", 7001)
            .with_node(NodeRole::Master, a.clone())
            .with_node(NodeRole::Master, b.clone());
        let options = node("127.0.0.1", 7001, true);

        let results = CommandRouter::default()
            .execute(
                &entry,
                "get k",
                RouteRequest {
                    role: None,
                    node_options: Some(&options),
                },
            )
            .await
            .unwrap();
        assert_eq!(results[0].status, CommandExecutionStatus::Fail);
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
    }

    #[tokio::test]
    async fn test_redirection_to_unknown_node_reaches_it() {
        let moved_to = Arc::new(FakeClient::new("10.0.0.9", 7009).on("get k", bulk("v")));
        let a = Arc::new(FakeClient::new("127.0.0.1", 7001).on_error("get k", "MOVED", "5 10.0.0.9:7009"));
        let entry = FakeClient::new("127.0.0.1", 7001)
            .with_node(NodeRole::Master, a)
            .with_reachable(moved_to);
        let options = node("127.0.0.1", 7001, true);

        let results = CommandRouter::default()
            .execute(
                &entry,
                "get k",
                RouteRequest {
                    role: None,
                    node_options: Some(&options),
                },
            )
            .await
            .unwrap();
        assert_eq!(results[0].response, serde_json::json!("v"));
        assert_eq!(results[0].node.as_ref().unwrap().host, "10.0.0.9");
    }

    #[tokio::test]
    async fn test_one_node_failure_does_not_abort_others() {
        let ok = Arc::new(FakeClient::new("127.0.0.1", 7001).on("dbsize", redis::Value::Int(3)));
        let down = Arc::new(FakeClient::new("127.0.0.1", 7002).on_disconnect("dbsize"));
        let entry = FakeClient::new("127.0.0.1", 7001)
            .with_node(NodeRole::Master, ok)
            .with_node(NodeRole::Master, down);

        let results = CommandRouter::default()
            .execute(
                &entry,
                "dbsize",
                RouteRequest {
                    role: Some(ClusterNodeRole::All),
                    node_options: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(results[0].status, CommandExecutionStatus::Success);
        assert_eq!(results[1].status, CommandExecutionStatus::Fail);
    }

    #[tokio::test]
    async fn test_size_limit() {
        let client = FakeClient::new("localhost", 6379).on("get big", bulk(&"x".repeat(64)));
        let router = CommandRouter::new(RouterOptions {
            max_result_size: 32,
            ..RouterOptions::default()
        });
        let results = router
            .execute(&client, "get big", RouteRequest::default())
            .await
            .unwrap();
        assert_eq!(results[0].status, CommandExecutionStatus::Success);
        assert_eq!(results[0].size_limit_exceeded, Some(true));
        assert_eq!(results[0].response, serde_json::json!(SIZE_LIMIT_EXCEEDED_MESSAGE));
    }

    #[tokio::test]
    async fn test_standalone_explicit_node() {
        let client = FakeClient::new("localhost", 6379).on("ping", redis::Value::SimpleString("PONG".to_string()));
        let router = CommandRouter::default();

        let same = node("localhost", 6379, false);
        let results = router
            .execute(&client, "ping", RouteRequest { role: None, node_options: Some(&same) })
            .await
            .unwrap();
        assert_eq!(results[0].response, serde_json::json!("PONG"));

        let other = node("localhost", 6380, false);
        assert!(
            router
                .execute(&client, "ping", RouteRequest { role: None, node_options: Some(&other) })
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_targets_resolve_before_deny_list() {
        let (entry, m1, ..) = cluster();
        let options = node("10.9.9.9", 7000, false);
        let err = CommandRouter::default()
            .execute(
                &entry,
                "monitor",
                RouteRequest {
                    role: None,
                    node_options: Some(&options),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound(_)));

        let known = node("127.0.0.1", 7001, false);
        let results = CommandRouter::default()
            .execute(
                &entry,
                "monitor",
                RouteRequest {
                    role: None,
                    node_options: Some(&known),
                },
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CommandExecutionStatus::Fail);
        assert_eq!(entry.call_count(), 0);
        assert_eq!(m1.call_count(), 0);
    }
}
