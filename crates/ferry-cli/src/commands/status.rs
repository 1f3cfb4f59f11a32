use std::process::ExitCode;

use ferry_config::{FerryConfig, StoreBackend, StoreConfig};
use ferry_core::{StoreRole, WriteMode};
use ferry_store::{RetryConfig, connect};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::commands::shared::EXIT_UNSUCCESSFUL;
use crate::output::output;
use crate::progress::Progress;

#[derive(Debug, Serialize)]
struct StoreStatus {
    role: StoreRole,
    backend: StoreBackend,
    location: String,
    reachable: bool,
    records: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    origin: StoreStatus,
    target: StoreStatus,
    write_mode: WriteMode,
    allow_degraded: bool,
}

/// Handle `ferry status`.
pub async fn handle(config: &FerryConfig, flags: &GlobalFlags) -> anyhow::Result<ExitCode> {
    let retry = RetryConfig::new(config.session.connect_attempts, config.session.connect_backoff());
    let progress = Progress::spinner("probing stores");
    let (origin, target) = tokio::join!(
        probe(StoreRole::Origin, &config.origin, &retry),
        probe(StoreRole::Target, &config.target, &retry),
    );
    progress.finish_clear();

    let response = StatusResponse {
        origin,
        target,
        write_mode: config.session.write_mode,
        allow_degraded: config.session.allow_degraded,
    };
    output(&response, flags.format, render_text)?;

    if response.origin.reachable && response.target.reachable {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_UNSUCCESSFUL))
    }
}

async fn probe(role: StoreRole, config: &StoreConfig, retry: &RetryConfig) -> StoreStatus {
    let mut status = StoreStatus {
        role,
        backend: config.backend,
        location: config.display_location(),
        reachable: false,
        records: None,
        error: None,
    };

    match connect(role, config, retry).await {
        Ok(client) => {
            match client.count().await {
                Ok(count) => {
                    status.reachable = true;
                    status.records = Some(count);
                }
                Err(error) => status.error = Some(error.to_string()),
            }
            client.close().await;
        }
        Err(error) => status.error = Some(error.to_string()),
    }
    status
}

fn render_text(response: &StatusResponse) -> String {
    let line = |s: &StoreStatus| match (&s.records, &s.error) {
        (Some(records), _) => format!("{:<7} {} ({records} records)", s.role.as_str(), s.location),
        (None, Some(error)) => format!("{:<7} unreachable: {error}", s.role.as_str()),
        (None, None) => format!("{:<7} unreachable", s.role.as_str()),
    };
    let mut lines = vec![line(&response.origin), line(&response.target)];
    lines.push(format!("mode    {}", response.write_mode));
    if !response.target.reachable && response.allow_degraded {
        lines.push("sessions will run degraded (origin only)".to_string());
    }
    lines.join("\n")
}
