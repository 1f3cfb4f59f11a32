use std::process::ExitCode;

use anyhow::Context;
use ferry_config::FerryConfig;
use ferry_core::StoreRole;
use ferry_engine::{BackfillOptions, BackfillStats, MigrationMetrics, backfill};
use ferry_store::{RetryConfig, connect};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::BackfillArgs;
use crate::commands::shared::EXIT_UNSUCCESSFUL;
use crate::output::output;
use crate::progress::Progress;

/// Handle `ferry backfill`.
pub async fn handle(
    args: &BackfillArgs,
    config: &FerryConfig,
    flags: &GlobalFlags,
    shutdown: &CancellationToken,
) -> anyhow::Result<ExitCode> {
    anyhow::ensure!(args.batch_size > 0, "--batch-size must be at least 1");

    let retry = RetryConfig::new(config.session.connect_attempts, config.session.connect_backoff());
    let progress = Progress::spinner("connecting to origin and target");
    let origin = connect(StoreRole::Origin, &config.origin, &retry)
        .await
        .context("backfill needs a reachable origin store")?;
    let target = match connect(StoreRole::Target, &config.target, &retry).await {
        Ok(target) => target,
        Err(error) => {
            progress.finish_err("target unreachable");
            origin.close().await;
            return Err(anyhow::Error::from(error).context("backfill needs a reachable target store"));
        }
    };

    progress.set_message(if args.dry_run {
        "counting records missing in target"
    } else {
        "copying records missing in target"
    });
    let metrics = MigrationMetrics::new();
    let options = BackfillOptions {
        batch_size: args.batch_size,
        dry_run: args.dry_run,
    };
    let result = backfill(&origin, &target, options, &metrics, shutdown).await;
    origin.close().await;
    target.close().await;
    progress.finish_clear();

    let stats = result.context("backfill failed")?;
    output(&stats, flags.format, render_text)?;

    if stats.failed > 0 || stats.partial {
        Ok(ExitCode::from(EXIT_UNSUCCESSFUL))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn render_text(stats: &BackfillStats) -> String {
    let mut lines = vec![
        format!("Origin records scanned: {}", stats.scanned),
        format!("Already in target:      {}", stats.already_present),
        format!("Missing in target:      {}", stats.missing),
    ];
    if stats.dry_run {
        lines.push("Dry run: nothing was copied".to_string());
    } else {
        lines.push(format!("Copied:                 {}", stats.copied));
        lines.push(format!("Failed:                 {}", stats.failed));
    }
    if stats.partial {
        lines.push("Cancelled before every batch ran; rerun to finish".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use ferry_engine::BackfillStats;

    use super::render_text;

    #[test]
    fn dry_run_text_omits_copy_counts() {
        let stats = BackfillStats {
            scanned: 10,
            already_present: 7,
            missing: 3,
            dry_run: true,
            ..BackfillStats::default()
        };
        let text = render_text(&stats);
        assert!(text.contains("Missing in target:      3"));
        assert!(text.contains("Dry run"));
        assert!(!text.contains("Copied"));
    }

    #[test]
    fn partial_run_is_called_out() {
        let stats = BackfillStats {
            scanned: 4,
            missing: 4,
            copied: 2,
            partial: true,
            ..BackfillStats::default()
        };
        let text = render_text(&stats);
        assert!(text.contains("Copied:                 2"));
        assert!(text.ends_with("rerun to finish"));
    }
}
