use std::process::ExitCode;

use anyhow::Context;
use ferry_config::FerryConfig;
use ferry_core::RecordKey;
use ferry_engine::{MigrationSession, SessionReport, Validation, new_session_id};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ValidateArgs;
use crate::commands::shared;
use crate::progress::Progress;

/// Handle `ferry validate`.
pub async fn handle(
    args: &ValidateArgs,
    config: &FerryConfig,
    flags: &GlobalFlags,
    shutdown: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    let validation = validation_for(args, config.session.sample_size)?;

    let id = new_session_id();
    let progress = Progress::spinner("connecting to origin and target");
    let mut session = match MigrationSession::connect_as(id.clone(), config, false).await {
        Ok(session) => session,
        Err(error) => {
            progress.finish_err("connection failed");
            let report = SessionReport::connection_failed(id, &error);
            return shared::emit_session(&report, config, flags, true);
        }
    };
    shared::forward_shutdown(shutdown, session.cancellation_token());

    progress.set_message(format!("reconciling ({} scope)", validation.scope()));
    let reconciled = session.reconcile(validation).await.map(|_| ());
    let report = match reconciled {
        Ok(()) => session.finish().await,
        Err(error) => session.fail(&error).await,
    };
    progress.finish_clear();

    shared::emit_session(&report, config, flags, args.dry_run)
}

/// Explicit keys win, then `--full`, then `--sample N`, then the configured
/// sample size.
fn validation_for(args: &ValidateArgs, default_sample: usize) -> anyhow::Result<Validation> {
    if !args.key.is_empty() {
        let keys = args
            .key
            .iter()
            .map(|raw| raw.parse::<RecordKey>())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid --key")?;
        return Ok(Validation::Keys(keys));
    }
    if args.full {
        return Ok(Validation::Full);
    }
    Ok(Validation::Sample(args.sample.unwrap_or(default_sample)))
}
