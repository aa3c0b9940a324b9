//! `exec` command

use redisscope_core::client::ClientMetadata;
use redisscope_core::execution::{
    CommandExecution, CreateCommandExecutionDto, CreateCommandExecutionsDto, NodeOptions,
    ResultsMode,
};
use redisscope_core::Endpoint;
use serde_json::{Value, json};
use tracing::info;

use crate::cli::ExecArgs;
use crate::connection::ConnectionManager;
use crate::error::{RedisScopeError, Result};
use crate::output::{OutputFormat, print_output};

fn node_options(args: &ExecArgs) -> Result<Option<NodeOptions>> {
    let Some(node) = &args.node else {
        return Ok(None);
    };
    let endpoint = Endpoint::parse(node).ok_or_else(|| RedisScopeError::InvalidInput {
        message: format!("'{}' is not a host:port address", node),
    })?;
    Ok(Some(NodeOptions {
        host: endpoint.host,
        port: endpoint.port,
        enable_redirection: args.redirect,
    }))
}

pub async fn handle_exec(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    args: &ExecArgs,
    output: OutputFormat,
) -> Result<()> {
    let (orchestrator, target) = conn_mgr.orchestrator(profile)?;
    let metadata = ClientMetadata::new(target.database_id).with_db(args.db);
    let node_options = node_options(args)?;
    let results_mode = ResultsMode::from(args.results_mode);

    let records = match args.commands.as_slice() {
        [command] if results_mode == ResultsMode::Default => {
            let dto = CreateCommandExecutionDto {
                command: command.clone(),
                mode: args.mode.into(),
                role: args.role.map(Into::into),
                node_options,
                ..CreateCommandExecutionDto::default()
            };
            vec![orchestrator.create_command_execution(&metadata, dto).await?]
        }
        commands => {
            let dto = CreateCommandExecutionsDto {
                commands: commands.to_vec(),
                mode: args.mode.into(),
                results_mode,
                role: args.role.map(Into::into),
                node_options,
                ..CreateCommandExecutionsDto::default()
            };
            orchestrator.create_command_executions(&metadata, dto).await?
        }
    };
    info!(records = records.len(), "Execution finished");

    match output {
        OutputFormat::Table => print_output(flatten(&records), output)?,
        _ => print_output(&records, output)?,
    }
    Ok(())
}

/// One row per node result, for table output
fn flatten(records: &[CommandExecution]) -> Vec<Value> {
    records
        .iter()
        .flat_map(|record| {
            let execution = &record.execution;
            execution.result.iter().map(move |result| {
                let node = result
                    .node
                    .as_ref()
                    .map(|n| format!("{}:{}", n.host, n.port))
                    .unwrap_or_default();
                json!({
                    "command": execution.command,
                    "node": node,
                    "status": result.status,
                    "response": result.response,
                    "ms": execution.execution_time,
                })
            })
        })
        .collect()
}
