//! Run submitted commands and persist what happened

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use super::consolidation::{CommandOutcome, consolidate};
use super::models::{
    CommandExecution, CommandExecutionResult, CreateCommandExecutionDto,
    CreateCommandExecutionsDto, NewCommandExecution, ResultsMode, ShortCommandExecution,
};
use super::store::CommandExecutionStore;
use crate::client::{ClientMetadata, CommandClient, ConnectionProvider};
use crate::error::{CoreError, Result};
use crate::router::{CommandRouter, RouteRequest};

/// Default number of commands of one batch dispatched at the same time
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub struct ExecutionOrchestrator {
    provider: Arc<dyn ConnectionProvider>,
    router: CommandRouter,
    store: Arc<dyn CommandExecutionStore>,
    max_concurrency: usize,
}

impl ExecutionOrchestrator {
    pub fn new(
        provider: Arc<dyn ConnectionProvider>,
        router: CommandRouter,
        store: Arc<dyn CommandExecutionStore>,
    ) -> Self {
        Self {
            provider,
            router,
            store,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Limit how many commands of a batch are in flight at once
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Run one command and persist one record
    pub async fn create_command_execution(
        &self,
        metadata: &ClientMetadata,
        dto: CreateCommandExecutionDto,
    ) -> Result<CommandExecution> {
        let client = self.provider.get_client(metadata).await?;

        let start = Instant::now();
        let result = self
            .router
            .execute(
                client.as_ref(),
                &dto.command,
                RouteRequest {
                    role: dto.role,
                    node_options: dto.node_options.as_ref(),
                },
            )
            .await?;
        let execution_time = elapsed_ms(start);
        info!(
            database_id = %metadata.database_id,
            execution_time,
            "Command executed"
        );

        let record = NewCommandExecution {
            database_id: metadata.database_id.clone(),
            db: metadata.db,
            command: dto.command,
            mode: dto.mode,
            results_mode: ResultsMode::Default,
            role: dto.role,
            node_options: dto.node_options,
            result,
            summary: None,
            execution_time,
            execution_type: dto.execution_type,
        };

        self.store
            .create_many(vec![record])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Storage("store returned no record".to_string()))
    }

    /// Run a batch and persist it according to `dto.results_mode`.
    ///
    /// Returned records follow submission order.
    pub async fn create_command_executions(
        &self,
        metadata: &ClientMetadata,
        dto: CreateCommandExecutionsDto,
    ) -> Result<Vec<CommandExecution>> {
        if dto.commands.is_empty() {
            return Err(CoreError::Validation("No commands to execute".to_string()));
        }

        let client = self.provider.get_client(metadata).await?;
        let request = RouteRequest {
            role: dto.role,
            node_options: dto.node_options.as_ref(),
        };

        debug!(
            commands = dto.commands.len(),
            concurrency = self.max_concurrency,
            results_mode = ?dto.results_mode,
            "Executing command batch"
        );

        let start = Instant::now();
        let outcomes: Vec<CommandOutcome> = stream::iter(
            dto.commands
                .iter()
                .map(|command| self.run(client.as_ref(), command, request)),
        )
        .buffered(self.max_concurrency)
        .try_collect()
        .await?;
        let batch_time = elapsed_ms(start);

        let records = consolidate(dto.results_mode, outcomes, batch_time)
            .into_iter()
            .map(|record| NewCommandExecution {
                database_id: metadata.database_id.clone(),
                db: metadata.db,
                command: record.command,
                mode: dto.mode,
                results_mode: dto.results_mode,
                role: dto.role,
                node_options: dto.node_options.clone(),
                result: record.result,
                summary: record.summary,
                execution_time: record.execution_time,
                execution_type: dto.execution_type,
            })
            .collect();

        let created = self.store.create_many(records).await?;
        info!(
            database_id = %metadata.database_id,
            records = created.len(),
            "Command batch executed"
        );
        Ok(created)
    }

    /// Run one command of a batch.
    ///
    /// A command that cannot be parsed becomes a failed outcome of its own;
    /// errors about the targets abort the batch.
    async fn run(
        &self,
        client: &dyn CommandClient,
        command: &str,
        request: RouteRequest<'_>,
    ) -> Result<CommandOutcome> {
        let start = Instant::now();
        let results = match self.router.execute(client, command, request).await {
            Ok(results) => results,
            Err(err @ CoreError::Validation(_)) => {
                warn!(command, error = %err, "Command rejected");
                vec![CommandExecutionResult::fail(err.to_string())]
            }
            Err(err) => return Err(err),
        };
        Ok(CommandOutcome {
            command: command.to_string(),
            results,
            execution_time: elapsed_ms(start),
        })
    }

    pub async fn list_command_executions(
        &self,
        metadata: &ClientMetadata,
    ) -> Result<Vec<ShortCommandExecution>> {
        self.store.list(&metadata.database_id).await
    }

    pub async fn get_command_execution(
        &self,
        metadata: &ClientMetadata,
        id: &str,
    ) -> Result<CommandExecution> {
        self.store.get(&metadata.database_id, id).await
    }

    pub async fn delete_command_execution(&self, metadata: &ClientMetadata, id: &str) -> Result<()> {
        self.store.delete(&metadata.database_id, id).await
    }

    /// Remove every record of the database
    pub async fn delete_command_executions(&self, metadata: &ClientMetadata) -> Result<()> {
        self.store.delete_all(&metadata.database_id).await
    }
}
