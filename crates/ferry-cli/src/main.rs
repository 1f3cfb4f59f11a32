use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ferry_config::FerryConfig;
use tokio_util::sync::CancellationToken;

mod cli;
mod commands;
mod generate;
mod output;
mod progress;
mod ui;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("ferry error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let flags = cli.global_flags();
    ui::init(&flags);

    if let cli::Commands::Schema(args) = &cli.command {
        return commands::schema::handle(args);
    }

    let config = FerryConfig::load_with_dotenv(flags.config.as_deref())
        .context("failed to load ferry configuration")?;

    let shutdown = CancellationToken::new();
    spawn_interrupt_handler(shutdown.clone());

    commands::dispatch::dispatch(cli.command, &config, &flags, &shutdown).await
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("FERRY_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

/// First Ctrl-C cancels in-flight work so partial results still get reported.
fn spawn_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing with partial results");
            shutdown.cancel();
        }
    });
}
