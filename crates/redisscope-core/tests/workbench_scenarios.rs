//! End-to-end scenarios over the scripted client

use std::collections::BTreeMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use redis::Value;
use redisscope_core::client::testing::{FakeClient, FakeProvider, bulk, bulk_array};
use redisscope_core::execution::{
    CommandExecutionStatus, CreateCommandExecutionsDto, ExecutionOrchestrator,
    InMemoryCommandExecutionStore, ResultsMode,
};
use redisscope_core::info::get_general_info;
use redisscope_core::router::{CommandRouter, RouteRequest, RouterOptions, UnsupportedCommands};
use redisscope_core::topology::{
    DeploymentTopology, NodeRole, determine_database_modules, determine_sentinel_master_groups,
    determine_topology, get_database_count_from_keyspace, is_cluster, is_sentinel,
};
use redisscope_core::{ClientMetadata, CoreError};

fn orchestrator(client: FakeClient) -> ExecutionOrchestrator {
    ExecutionOrchestrator::new(
        Arc::new(FakeProvider::new(Arc::new(client))),
        CommandRouter::default(),
        Arc::new(InMemoryCommandExecutionStore::default()),
    )
}

fn batch(commands: &[&str], results_mode: ResultsMode) -> CreateCommandExecutionsDto {
    CreateCommandExecutionsDto {
        commands: commands.iter().map(|c| c.to_string()).collect(),
        results_mode,
        ..CreateCommandExecutionsDto::default()
    }
}

fn standalone() -> FakeClient {
    FakeClient::new("127.0.0.1", 6379)
        .on("set 1 1", Value::Okay)
        .on("get 1", bulk("1"))
}

#[tokio::test]
async fn probes_never_fail_on_protocol_errors() {
    let plain = FakeClient::new("127.0.0.1", 6379);
    assert!(!is_cluster(&plain).await);
    assert!(!is_sentinel(&plain).await);

    let denied = FakeClient::new("127.0.0.1", 6379)
        .on_error("cluster info", "NOPERM", "this user has no permissions to run the 'cluster|info' command")
        .on_error("sentinel masters", "NOPERM", "this user has no permissions");
    assert!(!is_cluster(&denied).await);
    assert!(!is_sentinel(&denied).await);

    let down = FakeClient::new("127.0.0.1", 6379)
        .on_disconnect("cluster info")
        .on_disconnect("sentinel masters");
    assert!(!is_cluster(&down).await);
    assert!(!is_sentinel(&down).await);
}

#[test]
fn keyspace_database_count() {
    assert_eq!(get_database_count_from_keyspace(Some(&BTreeMap::new())), 1);
    assert_eq!(get_database_count_from_keyspace(None), 1);

    let keyspace: BTreeMap<String, String> = [
        ("db0", "keys=21,expires=0,avg_ttl=0"),
        ("db1", "keys=31,expires=0,avg_ttl=0"),
        ("db6", "keys=41,expires=0,avg_ttl=0"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(get_database_count_from_keyspace(Some(&keyspace)), 7);
}

#[tokio::test]
async fn module_detection_versions_and_fallback() {
    let with_list = FakeClient::new("127.0.0.1", 6379).on(
        "module list",
        Value::Array(vec![Value::Array(vec![
            bulk("name"),
            bulk("search"),
            bulk("ver"),
            Value::Int(20_804),
        ])]),
    );
    let modules = determine_database_modules(&with_list).await;
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name, "search");
    assert_eq!(modules[0].version, Some(20_804));
    assert_eq!(modules[0].semantic_version.as_deref(), Some("2.8.4"));

    let without_list = FakeClient::new("127.0.0.1", 6379)
        .on_error("module list", "ERR", "unknown command 'MODULE'")
        .on("command info json.get", Value::Array(vec![bulk_array(&["json.get"])]))
        .on("command info ft.info", Value::Array(vec![Value::Nil]));
    let modules = determine_database_modules(&without_list).await;
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].name, "ReJSON");
    assert_eq!(modules[0].version, None);
    assert_eq!(modules[0].semantic_version, None);
}

fn node_info(used_memory: u64, keys: u64) -> String {
    format!(
        "# Server\r\nredis_version:7.2.4\r\nredis_mode:cluster\r\n\r\n# Memory\r\nused_memory:{}\r\n\r\n# Keyspace\r\ndb0:keys={},expires=0,avg_ttl=0\r\n",
        used_memory, keys
    )
}

#[tokio::test]
async fn cluster_statistics_are_summed() {
    let k = 3u64;
    let mut entry = FakeClient::new("127.0.0.1", 7000);
    for port in 0..k {
        let node = Arc::new(FakeClient::new("127.0.0.1", 7000 + port as u16).with_info(&node_info(100, 5)));
        entry = entry.with_node(NodeRole::Master, node);
    }

    let stats = get_general_info(&entry).await.unwrap();
    assert_eq!(stats.used_memory, Some(k * 100));
    assert_eq!(stats.total_keys, Some(k * 5));
    assert_eq!(stats.nodes.as_ref().map(Vec::len), Some(k as usize));
}

#[tokio::test]
async fn sentinel_discovery_on_plain_server_is_wrong_tool() {
    let plain = FakeClient::new("127.0.0.1", 6379);
    let err = determine_sentinel_master_groups(&plain).await.unwrap_err();
    assert!(err.is_wrong_discovery_tool());
    assert!(!err.is_connection_error());
}

#[tokio::test]
async fn standalone_topology() {
    let plain = FakeClient::new("127.0.0.1", 6379)
        .on_error("cluster info", "ERR", "This instance has cluster support disabled");
    assert_eq!(determine_topology(&plain).await.unwrap(), DeploymentTopology::Standalone);
}

#[tokio::test]
async fn results_modes_record_counts() {
    let metadata = ClientMetadata::new("db");

    let default = orchestrator(standalone())
        .create_command_executions(&metadata, batch(&["set 1 1", "get 1"], ResultsMode::Default))
        .await
        .unwrap();
    assert_eq!(default.len(), 2);

    let grouped = orchestrator(standalone())
        .create_command_executions(&metadata, batch(&["set 1 1", "get 1"], ResultsMode::GroupMode))
        .await
        .unwrap();
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].execution.summary.unwrap().total, 2);

    let failing = standalone().on_error("get 1", "WRONGTYPE", "Operation against a key holding the wrong kind of value");
    let silent = orchestrator(failing)
        .create_command_executions(&metadata, batch(&["set 1 1", "get 1"], ResultsMode::Silent))
        .await
        .unwrap();
    assert_eq!(silent.len(), 1);
    let record = &silent[0].execution;
    assert_eq!(record.summary.unwrap().total, 2);
    assert_eq!(record.result[0].response.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deny_listed_command_never_reaches_server() {
    let client = Arc::new(FakeClient::new("127.0.0.1", 6379));
    let provider = Arc::new(FakeProvider::new(client.clone()));
    let orchestrator = ExecutionOrchestrator::new(
        provider,
        CommandRouter::new(RouterOptions {
            unsupported: UnsupportedCommands::new(["blpop"]),
            ..RouterOptions::default()
        }),
        Arc::new(InMemoryCommandExecutionStore::default()),
    );

    for command in ["psubscribe news.*", "blpop queue 0"] {
        let records = orchestrator
            .create_command_executions(&ClientMetadata::new("db"), batch(&[command], ResultsMode::Default))
            .await
            .unwrap();
        let result = &records[0].execution.result[0];
        assert_eq!(result.status, CommandExecutionStatus::Fail);
        let name = command.split_whitespace().next().unwrap().to_uppercase();
        assert!(result.response.as_str().unwrap().contains(&name));
    }
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn unresolvable_target_is_an_error() {
    let node = Arc::new(FakeClient::new("127.0.0.1", 7000));
    let entry = FakeClient::new("127.0.0.1", 7000).with_node(NodeRole::Master, node);
    let options = redisscope_core::execution::NodeOptions {
        host: "127.0.0.1".to_string(),
        port: 7999,
        enable_redirection: true,
    };
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
