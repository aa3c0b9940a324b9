//! Command execution data model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Endpoint;
use crate::topology::NodeRole;

/// Outcome of a command on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandExecutionStatus {
    Success,
    Fail,
}

impl CommandExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandExecutionStatus::Success)
    }
}

/// Node that produced a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultNode {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u16>,
}

impl From<Endpoint> for ResultNode {
    fn from(endpoint: Endpoint) -> Self {
        Self {
            host: endpoint.host,
            port: endpoint.port,
            slot: None,
        }
    }
}

/// One stored result entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecutionResult {
    pub status: CommandExecutionStatus,
    pub response: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<ResultNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_limit_exceeded: Option<bool>,
}

impl CommandExecutionResult {
    pub fn success(response: serde_json::Value) -> Self {
        Self {
            status: CommandExecutionStatus::Success,
            response,
            node: None,
            command: None,
            size_limit_exceeded: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: CommandExecutionStatus::Fail,
            response: serde_json::Value::String(message.into()),
            node: None,
            command: None,
            size_limit_exceeded: None,
        }
    }

    pub fn with_node(mut self, node: ResultNode) -> Self {
        self.node = Some(node);
        self
    }
}

/// Node subset a command fans out to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClusterNodeRole {
    All,
    Master,
    Slave,
}

impl ClusterNodeRole {
    pub fn matches(&self, role: NodeRole) -> bool {
        match self {
            ClusterNodeRole::All => true,
            ClusterNodeRole::Master => role == NodeRole::Master,
            ClusterNodeRole::Slave => role == NodeRole::Replica,
        }
    }
}

impl fmt::Display for ClusterNodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterNodeRole::All => write!(f, "ALL"),
            ClusterNodeRole::Master => write!(f, "MASTER"),
            ClusterNodeRole::Slave => write!(f, "SLAVE"),
        }
    }
}

/// Explicit single-node target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOptions {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub enable_redirection: bool,
}

impl NodeOptions {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}

/// How a batch of results is consolidated into stored records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultsMode {
    #[default]
    #[serde(rename = "DEFAULT")]
    Default,
    #[serde(rename = "GROUP_MODE")]
    GroupMode,
    #[serde(rename = "SILENT")]
    Silent,
}

/// Display formatting requested by the caller; does not affect routing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunQueryMode {
    #[default]
    Ascii,
    Raw,
}

/// Which surface submitted the execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandExecutionType {
    #[default]
    Workbench,
    Search,
}

/// Per-command counts for grouped executions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub success: usize,
    pub fail: usize,
}

/// Request to run one command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommandExecutionDto {
    pub command: String,
    #[serde(default)]
    pub mode: RunQueryMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ClusterNodeRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_options: Option<NodeOptions>,
    #[serde(default, rename = "type")]
    pub execution_type: CommandExecutionType,
}

/// Request to run a batch of commands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommandExecutionsDto {
    pub commands: Vec<String>,
    #[serde(default)]
    pub mode: RunQueryMode,
    #[serde(default)]
    pub results_mode: ResultsMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ClusterNodeRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_options: Option<NodeOptions>,
    #[serde(default, rename = "type")]
    pub execution_type: CommandExecutionType,
}

/// A record ready to be persisted; the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommandExecution {
    pub database_id: String,
    pub db: u32,
    pub command: String,
    pub mode: RunQueryMode,
    pub results_mode: ResultsMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ClusterNodeRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_options: Option<NodeOptions>,
    pub result: Vec<CommandExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ExecutionSummary>,
    /// Wall-clock time in milliseconds
    pub execution_time: u64,
    #[serde(rename = "type")]
    pub execution_type: CommandExecutionType,
}

/// A persisted execution. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecution {
    pub id: String,
    #[serde(flatten)]
    pub execution: NewCommandExecution,
    pub created_at: DateTime<Utc>,
}

/// List view of an execution, without results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortCommandExecution {
    pub id: String,
    pub database_id: String,
    pub db: u32,
    pub command: String,
    pub mode: RunQueryMode,
    pub results_mode: ResultsMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ExecutionSummary>,
    pub execution_time: u64,
    #[serde(rename = "type")]
    pub execution_type: CommandExecutionType,
    pub created_at: DateTime<Utc>,
}

impl From<&CommandExecution> for ShortCommandExecution {
    fn from(record: &CommandExecution) -> Self {
        let e = &record.execution;
        Self {
            id: record.id.clone(),
            database_id: e.database_id.clone(),
            db: e.db,
            command: e.command.clone(),
            mode: e.mode,
            results_mode: e.results_mode,
            summary: e.summary,
            execution_time: e.execution_time,
            execution_type: e.execution_type,
            created_at: record.created_at,
        }
    }
}
