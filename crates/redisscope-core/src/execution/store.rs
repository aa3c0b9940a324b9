//! Persistence collaborator for command executions

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::models::{CommandExecution, NewCommandExecution, ShortCommandExecution};
use crate::error::{CoreError, Result};

/// Default number of records kept per database
pub const DEFAULT_EXECUTIONS_LIMIT: usize = 30;

const ENTITY: &str = "Command execution";

/// Stores execution records. Records are opaque to the caller once written.
#[async_trait]
pub trait CommandExecutionStore: Send + Sync {
    /// Persist records, assigning ids and timestamps. Returns them in input order.
    async fn create_many(&self, records: Vec<NewCommandExecution>) -> Result<Vec<CommandExecution>>;

    /// Records of a database, newest first
    async fn list(&self, database_id: &str) -> Result<Vec<ShortCommandExecution>>;

    async fn get(&self, database_id: &str, id: &str) -> Result<CommandExecution>;

    async fn delete(&self, database_id: &str, id: &str) -> Result<()>;

    /// Remove every record of a database
    async fn delete_all(&self, database_id: &str) -> Result<()>;
}

/// Process-local store with a per-database retention limit
#[derive(Debug)]
pub struct InMemoryCommandExecutionStore {
    limit: usize,
    next_id: AtomicU64,
    records: RwLock<BTreeMap<String, VecDeque<CommandExecution>>>,
}

impl Default for InMemoryCommandExecutionStore {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTIONS_LIMIT)
    }
}

impl InMemoryCommandExecutionStore {
    /// Keep at most `limit` records per database; the oldest are evicted first
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            next_id: AtomicU64::new(1),
            records: RwLock::new(BTreeMap::new()),
        }
    }

    fn next_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

#[async_trait]
impl CommandExecutionStore for InMemoryCommandExecutionStore {
    async fn create_many(&self, records: Vec<NewCommandExecution>) -> Result<Vec<CommandExecution>> {
        let mut guard = self.records.write().await;
        let mut created = Vec::with_capacity(records.len());

        for execution in records {
            let record = CommandExecution {
                id: self.next_id(),
                execution,
                created_at: Utc::now(),
            };
            let entries = guard.entry(record.execution.database_id.clone()).or_default();
            entries.push_back(record.clone());
            while entries.len() > self.limit {
                if let Some(evicted) = entries.pop_front() {
                    debug!(id = %evicted.id, "Evicted oldest command execution");
                }
            }
            created.push(record);
        }

        Ok(created)
    }

    async fn list(&self, database_id: &str) -> Result<Vec<ShortCommandExecution>> {
        let guard = self.records.read().await;
        Ok(guard
            .get(database_id)
            .map(|entries| entries.iter().rev().map(ShortCommandExecution::from).collect())
            .unwrap_or_default())
    }

    async fn get(&self, database_id: &str, id: &str) -> Result<CommandExecution> {
        let guard = self.records.read().await;
        guard
            .get(database_id)
            .and_then(|entries| entries.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: ENTITY,
                id: id.to_string(),
            })
    }

    async fn delete(&self, database_id: &str, id: &str) -> Result<()> {
        let mut guard = self.records.write().await;
        let entries = guard.get_mut(database_id);
        let position = entries
            .as_ref()
            .and_then(|entries| entries.iter().position(|r| r.id == id));

        match (entries, position) {
            (Some(entries), Some(position)) => {
                entries.remove(position);
                Ok(())
            }
            _ => Err(CoreError::NotFound {
                entity: ENTITY,
                id: id.to_string(),
            }),
        }
    }

    async fn delete_all(&self, database_id: &str) -> Result<()> {
        self.records.write().await.remove(database_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::models::{
        CommandExecutionResult, CommandExecutionType, ResultsMode, RunQueryMode,
    };

    fn record(database_id: &str, command: &str) -> NewCommandExecution {
        NewCommandExecution {
            database_id: database_id.to_string(),
            db: 0,
            command: command.to_string(),
            mode: RunQueryMode::Ascii,
            results_mode: ResultsMode::Default,
            role: None,
            node_options: None,
            result: vec![CommandExecutionResult::success(serde_json::json!("OK"))],
            summary: None,
            execution_time: 1,
            execution_type: CommandExecutionType::Workbench,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryCommandExecutionStore::default();
        let created = store
            .create_many(vec![record("db1", "set a 1"), record("db1", "get a")])
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_ne!(created[0].id, created[1].id);
        assert_eq!(created[1].execution.command, "get a");

        let fetched = store.get("db1", &created[0].id).await.unwrap();
        assert_eq!(fetched, created[0]);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_scoped() {
        let store = InMemoryCommandExecutionStore::default();
        store
            .create_many(vec![record("db1", "first"), record("db1", "second"), record("db2", "other")])
            .await
            .unwrap();

        let list = store.list("db1").await.unwrap();
        let commands: Vec<_> = list.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["second", "first"]);
        assert!(store.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_from_other_database_is_not_found() {
        let store = InMemoryCommandExecutionStore::default();
        let created = store.create_many(vec![record("db1", "ping")]).await.unwrap();
        let err = store.get("db2", &created[0].id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryCommandExecutionStore::default();
        let created = store.create_many(vec![record("db1", "ping")]).await.unwrap();

        store.delete("db1", &created[0].id).await.unwrap();
        assert!(store.get("db1", &created[0].id).await.unwrap_err().is_not_found());
        assert!(store.delete("db1", &created[0].id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let store = InMemoryCommandExecutionStore::default();
        store
            .create_many(vec![record("db1", "a"), record("db1", "b"), record("db2", "c")])
            .await
            .unwrap();
        store.delete_all("db1").await.unwrap();
        assert!(store.list("db1").await.unwrap().is_empty());
        assert_eq!(store.list("db2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retention_limit() {
        let store = InMemoryCommandExecutionStore::new(2);
        let created = store
            .create_many(vec![record("db1", "a"), record("db1", "b"), record("db1", "c")])
            .await
            .unwrap();
        assert_eq!(created.len(), 3);

        let list = store.list("db1").await.unwrap();
        let commands: Vec<_> = list.iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["c", "b"]);
        assert!(store.get("db1", &created[0].id).await.is_err());
    }
}
