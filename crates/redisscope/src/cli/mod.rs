//! CLI structure and command definitions

use clap::{Parser, Subcommand, ValueEnum};
use redisscope_core::execution::{ClusterNodeRole, ResultsMode, RunQueryMode};

use crate::output::OutputFormat;

/// Inspect Redis deployments and run commands against their nodes
#[derive(Parser, Debug)]
#[command(name = "redisscope")]
#[command(version, about = "Probe Redis deployments and run commands across cluster nodes")]
#[command(long_about = "
Probe Redis deployments and run commands across cluster nodes

The target is taken from --url, or from a profile in the config file.

EXAMPLES:
    # Save a profile
    redisscope profile set local --url redis://127.0.0.1:6379

    # What is this deployment?
    redisscope probe

    # Aggregated server statistics
    redisscope info -o table

    # Run on every master of a cluster
    redisscope exec --role master 'dbsize'

    # Run a batch and store it as one grouped record
    redisscope exec --results-mode group 'set 1 1' 'get 1'

    # Target one node and follow a MOVED reply
    redisscope exec --node 127.0.0.1:7001 --redirect 'get user:42'
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "REDISSCOPE_PROFILE")]
    pub profile: Option<String>,

    /// Connect to this URL instead of a profile
    #[arg(long, global = true, env = "REDIS_URL")]
    pub url: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "REDISSCOPE_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect topology, loaded modules and logical database count
    Probe,

    /// Server statistics, aggregated over all nodes for a cluster
    Info,

    /// Run one or more commands
    #[command(after_help = "EXAMPLES:
    redisscope exec 'ping'
    redisscope exec --role all 'info server'
    redisscope exec --results-mode silent 'set a 1' 'incr a' 'lpush a x'
")]
    Exec(ExecArgs),

    /// Profile management
    #[command(subcommand)]
    Profile(ProfileCommands),
}

#[derive(clap::Args, Debug)]
pub struct ExecArgs {
    /// Commands, one per argument
    #[arg(required = true)]
    pub commands: Vec<String>,

    /// Run on every cluster node with this role
    #[arg(long, value_enum, conflicts_with = "node")]
    pub role: Option<RoleArg>,

    /// Run on one node, as host:port
    #[arg(long)]
    pub node: Option<String>,

    /// Follow a MOVED reply from --node once
    #[arg(long, requires = "node")]
    pub redirect: bool,

    /// How a batch is stored
    #[arg(long, value_enum, default_value = "default")]
    pub results_mode: ResultsModeArg,

    /// Display mode recorded with the execution
    #[arg(long, value_enum, default_value = "ascii")]
    pub mode: ModeArg,

    /// Logical database index
    #[arg(long, default_value_t = 0)]
    pub db: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    All,
    Master,
    Slave,
}

impl From<RoleArg> for ClusterNodeRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::All => ClusterNodeRole::All,
            RoleArg::Master => ClusterNodeRole::Master,
            RoleArg::Slave => ClusterNodeRole::Slave,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResultsModeArg {
    Default,
    Group,
    Silent,
}

impl From<ResultsModeArg> for ResultsMode {
    fn from(mode: ResultsModeArg) -> Self {
        match mode {
            ResultsModeArg::Default => ResultsMode::Default,
            ResultsModeArg::Group => ResultsMode::GroupMode,
            ResultsModeArg::Silent => ResultsMode::Silent,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Ascii,
    Raw,
}

impl From<ModeArg> for RunQueryMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Ascii => RunQueryMode::Ascii,
            ModeArg::Raw => RunQueryMode::Raw,
        }
    }
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show one profile
    Show {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set {
        /// Profile name
        name: String,

        /// redis:// or rediss:// URL
        #[arg(long)]
        url: String,

        /// Identifier executions are stored under
        #[arg(long)]
        database_id: Option<String>,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name
        name: String,
    },

    /// Set the default profile
    Default {
        /// Profile name
        name: String,
    },

    /// Print the config file location
    Path,
}
