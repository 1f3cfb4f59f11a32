use std::process::ExitCode;

use anyhow::Context;
use ferry_config::FerryConfig;
use ferry_engine::{
    MigrationSession, SessionPlan, SessionReport, Validation, new_session_id,
};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RunArgs;
use crate::commands::shared;
use crate::generate::demo_requests;
use crate::progress::Progress;

/// Handle `ferry run`.
pub async fn handle(
    args: &RunArgs,
    config: &FerryConfig,
    flags: &GlobalFlags,
    shutdown: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    let plan = plan_for(args, config);
    plan.validate().context("invalid write plan")?;
    let journal = config.report.journal && !args.dry_run;

    let id = new_session_id();
    let progress = Progress::spinner("connecting to origin and target");
    let session = match MigrationSession::connect_as(id.clone(), config, journal).await {
        Ok(session) => session,
        Err(error) => {
            progress.finish_err("connection failed");
            let report = SessionReport::connection_failed(id, &error);
            return shared::emit_session(&report, config, flags, true);
        }
    };
    shared::forward_shutdown(shutdown, session.cancellation_token());
    if let Some(path) = session.journal_path() {
        tracing::info!(path = %path.display(), "journaling write outcomes");
    }

    progress.set_message(format!(
        "writing {} records ({}), then reconciling",
        plan.writes.len(),
        plan.mode
    ));
    let report = session.run(plan).await;
    progress.finish_clear();
    let report = report.context("invalid write plan")?;

    shared::emit_session(&report, config, flags, args.dry_run)
}

/// A dry run writes nothing, so it validates against existing keys instead of
/// the records this run would have written.
fn plan_for(args: &RunArgs, config: &FerryConfig) -> SessionPlan {
    let mode = args.mode.unwrap_or(config.session.write_mode);
    let sample = args.sample.unwrap_or(config.session.sample_size);
    let validation = if args.full {
        Validation::Full
    } else if args.dry_run {
        Validation::Sample(sample)
    } else {
        Validation::Written(sample)
    };
    let writes = if args.dry_run {
        Vec::new()
    } else {
        demo_requests(args.records)
    };

    SessionPlan {
        writes,
        mode,
        validation,
    }
}
