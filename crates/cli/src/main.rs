use crate::{
    config::FerryConfig,
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use engine_core::origin::OriginRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod env;
mod error;
mod runner;
mod shutdown;

#[derive(Parser)]
#[command(name = "ferry", version, about = "Pull platform APIs into a relational database")]
struct Cli {
    #[arg(long, default_value = "ferry.toml", help = "Config file path")]
    config: String,

    #[arg(long, help = "Optional .env file whose variables override the environment")]
    env_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match execute(cli, &shutdown).await {
        Ok(()) => ExitCode::Success,
        Err(e) if e.is_cancelled() || shutdown.is_shutdown_requested() => {
            info!("Run interrupted; buffered rows were flushed");
            ExitCode::ShutdownRequested
        }
        Err(e) => {
            error!(error = %e, "ferry failed");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn execute(cli: Cli, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    let registry = OriginRegistry::new();
    if let Commands::Origins = cli.command {
        runner::list_origins(&registry);
        return Ok(());
    }

    let mut env = EnvManager::new();
    if let Some(path) = &cli.env_file {
        env.load_from_file(path)?;
    }
    let config = FerryConfig::load(&cli.config, &env)?;

    match cli.command {
        Commands::Run {
            origin,
            input,
            output,
        } => {
            info!(origin = %origin, input = %input, output = %output, config = %cli.config, "Starting run");
            runner::run_origin(&config, &registry, &origin, &input, &output, shutdown.cancel_token())
                .await
        }
        Commands::TestConn { alias } => runner::test_connection(&config, &alias).await,
        Commands::Origins => Ok(()),
    }
}
