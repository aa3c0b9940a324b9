//! # redisscope-core
//!
//! Topology discovery, status aggregation and multi-node command routing for
//! Redis deployments.
//!
//! ## Components
//!
//! - **[`topology`]** - best-effort probing: is this a cluster, a sentinel,
//!   which modules are loaded, how many logical databases exist
//! - **[`info`]** - parse `INFO` and fold per-node statistics into one summary
//! - **[`router`]** - send one command to the right node(s), follow a single
//!   `MOVED` hop on request, reject interactive commands
//! - **[`execution`]** - run single commands or batches, consolidate their
//!   results and persist them
//! - **[`client`]** - the narrow command-issuing seam everything above talks to,
//!   with an implementation on the `redis` crate
//! - **[`config`]** - profiles and workbench settings from a TOML file
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use redisscope_core::client::{ClientMetadata, RedisConnectionProvider};
//! use redisscope_core::execution::{
//!     CreateCommandExecutionsDto, ExecutionOrchestrator, InMemoryCommandExecutionStore,
//!     ResultsMode,
//! };
//! use redisscope_core::router::CommandRouter;
//!
//! # async fn run() -> redisscope_core::Result<()> {
//! let provider = RedisConnectionProvider::new().with_database("local", "redis://127.0.0.1:6379");
//! let orchestrator = ExecutionOrchestrator::new(
//!     Arc::new(provider),
//!     CommandRouter::default(),
//!     Arc::new(InMemoryCommandExecutionStore::default()),
//! );
//!
//! let records = orchestrator
//!     .create_command_executions(
//!         &ClientMetadata::new("local"),
//!         CreateCommandExecutionsDto {
//!             commands: vec!["set 1 1".to_string(), "get 1".to_string()],
//!             results_mode: ResultsMode::GroupMode,
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! assert_eq!(records.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod info;
pub mod reply;
pub mod router;
pub mod topology;

pub use client::{ClientMetadata, CommandClient, ConnectionProvider, Endpoint, NodeHandle};
pub use error::{CoreError, ReplyError, ReplyErrorKind, Result};
