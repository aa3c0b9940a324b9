//! Command execution: orchestration, result-view policies and persistence

pub mod consolidation;
pub mod models;
pub mod orchestrator;
pub mod store;

pub use consolidation::{CommandOutcome, ConsolidatedRecord, consolidate};
pub use models::{
    ClusterNodeRole, CommandExecution, CommandExecutionResult, CommandExecutionStatus,
    CommandExecutionType, CreateCommandExecutionDto, CreateCommandExecutionsDto,
    ExecutionSummary, NewCommandExecution, NodeOptions, ResultNode, ResultsMode, RunQueryMode,
    ShortCommandExecution,
};
pub use orchestrator::{DEFAULT_MAX_CONCURRENCY, ExecutionOrchestrator};
pub use store::{CommandExecutionStore, DEFAULT_EXECUTIONS_LIMIT, InMemoryCommandExecutionStore};
