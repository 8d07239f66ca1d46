use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use gator::cli::{execute, Cli, Context};
use gator::{Config, Database, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = Config::load_or_default(&cli.config)?;
    let mut config = file_config.clone();
    config.apply_env_overrides();
    config.validate()?;

    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }
    debug!(config = ?cli.config, "Configuration loaded");

    let db = Database::open(&config.database.path).await?;
    let mut ctx = Context::new(file_config, config, cli.config, db);

    let mut stdout = std::io::stdout().lock();
    execute(&mut ctx, cli.command, &mut stdout).await
}
