use anyhow::{Context, Result};
use clap::Parser;
use redisscope_core::config::Config;
use tracing::{debug, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands};
use connection::ConnectionManager;
use error::RedisScopeError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load().context("Failed to load config")?, None)
    };
    let mut conn_mgr = ConnectionManager::with_config_path(config, config_path, cli.url.clone());

    if let Err(e) = execute_command(&cli, &mut conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // RUST_LOG wins over the verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "redisscope=warn,redisscope_core=warn",
            1 => "redisscope=info,redisscope_core=info",
            2 => "redisscope=debug,redisscope_core=debug",
            _ => "redisscope=trace,redisscope_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(
    cli: &Cli,
    conn_mgr: &mut ConnectionManager,
) -> Result<(), RedisScopeError> {
    trace!("Executing command: {:?}", cli.command);
    let profile = cli.profile.as_deref();

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Probe => commands::database::handle_probe(conn_mgr, profile, cli.output).await,
        Commands::Info => commands::database::handle_info(conn_mgr, profile, cli.output).await,
        Commands::Exec(args) => {
            commands::exec::handle_exec(conn_mgr, profile, args, cli.output).await
        }
        Commands::Profile(profile_cmd) => {
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output).await
        }
    };

    info!("Command completed in {:?}", start.elapsed());
    result
}
