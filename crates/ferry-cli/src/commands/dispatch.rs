use std::process::ExitCode;

use ferry_config::FerryConfig;
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    config: &FerryConfig,
    flags: &GlobalFlags,
    shutdown: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Validate(args) => commands::validate::handle(&args, config, flags, shutdown).await,
        Commands::Run(args) => commands::run::handle(&args, config, flags, shutdown).await,
        Commands::Backfill(args) => commands::backfill::handle(&args, config, flags, shutdown).await,
        Commands::Status => commands::status::handle(config, flags).await,
        Commands::Schema(_) => unreachable!("schema is pre-dispatched in main"),
    }
}
