use std::process::ExitCode;

use ferry_core::{ConsistencyResult, ValidationSummary};
use ferry_engine::{BackfillStats, SessionReport};
use schemars::schema_for;

use crate::cli::root_commands::{SchemaArgs, SchemaType};

/// Handle `ferry schema`. Always pretty JSON, regardless of `--format`.
pub fn handle(args: &SchemaArgs) -> anyhow::Result<ExitCode> {
    println!("{}", schema_json(args.type_name)?);
    Ok(ExitCode::SUCCESS)
}

fn schema_json(kind: SchemaType) -> anyhow::Result<String> {
    let schema = match kind {
        SchemaType::SessionReport => schema_for!(SessionReport),
        SchemaType::Summary => schema_for!(ValidationSummary),
        SchemaType::ConsistencyResult => schema_for!(ConsistencyResult),
        SchemaType::Backfill => schema_for!(BackfillStats),
    };
    Ok(serde_json::to_string_pretty(&schema)?)
}
