//! Pieces shared by the session-driving commands (`validate`, `run`).

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use ferry_config::FerryConfig;
use ferry_core::SessionState;
use ferry_engine::{SessionReport, generate_report, write_report};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Exit status for a session that ran but missed its success criteria.
pub const EXIT_UNSUCCESSFUL: u8 = 2;
/// Exit status for a session that could not run at all.
pub const EXIT_FATAL: u8 = 1;

/// Forward process shutdown (Ctrl-C) into a session's own token.
pub fn forward_shutdown(shutdown: &CancellationToken, session: CancellationToken) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = shutdown.cancelled() => session.cancel(),
            () = session.cancelled() => {}
        }
    });
}

pub const fn exit_status(report: &SessionReport) -> u8 {
    match report.state {
        SessionState::Failed => EXIT_FATAL,
        _ if report.success => 0,
        _ => EXIT_UNSUCCESSFUL,
    }
}

#[derive(Serialize)]
struct SessionOutput<'a> {
    #[serde(flatten)]
    report: &'a SessionReport,
    report_path: Option<PathBuf>,
}

/// Write the text report (unless `dry_run` or the session failed) and print
/// the outcome.
pub fn emit_session(
    report: &SessionReport,
    config: &FerryConfig,
    flags: &GlobalFlags,
    dry_run: bool,
) -> anyhow::Result<ExitCode> {
    let generated_at = Utc::now();
    let text = generate_report(
        &report.summary,
        &report.results,
        &config.report.thresholds(),
        generated_at,
    );

    let report_path = if dry_run || report.state == SessionState::Failed {
        None
    } else {
        let dir = Path::new(&config.report.output_dir);
        let path = write_report(dir, &text, generated_at)
            .with_context(|| format!("failed to write report under {}", dir.display()))?;
        tracing::info!(path = %path.display(), "consistency report written");
        Some(path)
    };

    let response = SessionOutput {
        report,
        report_path,
    };
    output(&response, flags.format, |out| render_text(out.report, &text, out.report_path.as_deref()))?;

    Ok(ExitCode::from(exit_status(report)))
}

fn render_text(report: &SessionReport, text: &str, path: Option<&Path>) -> String {
    let mut out = String::new();
    if report.state == SessionState::Failed {
        let reason = report.failure.as_deref().unwrap_or("unknown error");
        let _ = writeln!(out, "session {} failed: {reason}", report.session_id);
        return out;
    }

    out.push_str(text);
    let _ = writeln!(out);
    let _ = writeln!(out, "Session: {} ({})", report.session_id, report.state);
    if report.degraded {
        let _ = writeln!(out, "Degraded: target unavailable, target writes were skipped");
    }
    if report.writes.requested > 0 {
        let _ = writeln!(
            out,
            "Writes: {} requested, {} committed, {} in both stores",
            report.writes.requested, report.writes.committed, report.writes.dual_succeeded
        );
    }
    if let Some(reason) = &report.failure {
        let _ = writeln!(out, "Note: {reason}");
    }
    match path {
        Some(path) => {
            let _ = writeln!(out, "Report: {}", path.display());
        }
        None => {
            let _ = writeln!(out, "Report: not written (dry run)");
        }
    }
    let _ = writeln!(out, "Success: {}", if report.success { "yes" } else { "no" });
    out
}
