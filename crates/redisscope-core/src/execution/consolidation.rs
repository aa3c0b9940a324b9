//! Result-view policies
//!
//! Turns the per-command results of a batch into the shape that gets
//! persisted. No I/O happens here.

use serde_json::json;

use super::models::{
    CommandExecutionResult, CommandExecutionStatus, ExecutionSummary, ResultsMode,
};

/// Results of one submitted command, in submission order within a batch
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub command: String,
    pub results: Vec<CommandExecutionResult>,
    /// Milliseconds spent on this command alone
    pub execution_time: u64,
}

impl CommandOutcome {
    /// A command failed if any node it targeted failed
    pub fn status(&self) -> CommandExecutionStatus {
        if self.results.iter().all(|r| r.status.is_success()) {
            CommandExecutionStatus::Success
        } else {
            CommandExecutionStatus::Fail
        }
    }

    /// Response echoed in a grouped entry: the bare response for a single
    /// node, otherwise every node's full result.
    fn grouped_response(&self) -> serde_json::Value {
        match self.results.as_slice() {
            [single] => single.response.clone(),
            many => serde_json::to_value(many).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Shape of one row to persist
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedRecord {
    pub command: String,
    pub result: Vec<CommandExecutionResult>,
    pub summary: Option<ExecutionSummary>,
    pub execution_time: u64,
}

/// Apply `mode` to a batch.
///
/// `batch_time` is the wall-clock time of the whole batch in milliseconds.
/// Grouped records report it; per-command records keep their own time.
pub fn consolidate(
    mode: ResultsMode,
    outcomes: Vec<CommandOutcome>,
    batch_time: u64,
) -> Vec<ConsolidatedRecord> {
    match mode {
        ResultsMode::Default => outcomes
            .into_iter()
            .map(|outcome| ConsolidatedRecord {
                command: outcome.command,
                result: outcome.results,
                summary: None,
                execution_time: outcome.execution_time,
            })
            .collect(),
        ResultsMode::GroupMode => vec![group(outcomes, false, batch_time)],
        ResultsMode::Silent => vec![group(outcomes, true, batch_time)],
    }
}

fn group(outcomes: Vec<CommandOutcome>, failures_only: bool, batch_time: u64) -> ConsolidatedRecord {
    let mut summary = ExecutionSummary {
        total: outcomes.len(),
        ..ExecutionSummary::default()
    };
    let mut entries = Vec::new();

    for outcome in &outcomes {
        let status = outcome.status();
        match status {
            CommandExecutionStatus::Success => summary.success += 1,
            CommandExecutionStatus::Fail => summary.fail += 1,
        }
        if failures_only && status.is_success() {
            continue;
        }
        entries.push(json!({
            "command": outcome.command,
            "status": status,
            "response": outcome.grouped_response(),
        }));
    }

    let status = if summary.fail == 0 {
        CommandExecutionStatus::Success
    } else {
        CommandExecutionStatus::Fail
    };
    let aggregate = CommandExecutionResult {
        status,
        response: serde_json::Value::Array(entries),
        node: None,
        command: None,
        size_limit_exceeded: None,
    };

    ConsolidatedRecord {
        command: outcomes
            .iter()
            .map(|o| o.command.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        result: vec![aggregate],
        summary: Some(summary),
        execution_time: batch_time,
    }
}
