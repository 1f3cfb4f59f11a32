use clap::{Args, Subcommand, ValueEnum};
use ferry_core::WriteMode;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Reconcile origin and target and write a consistency report.
    Validate(ValidateArgs),
    /// Dual-write demo records, settle, reconcile, and report.
    Run(RunArgs),
    /// Copy origin records that are missing in the target.
    Backfill(BackfillArgs),
    /// Check both connections and show record counts.
    Status,
    /// Print the JSON Schema of a ferry output type.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct ValidateArgs {
    /// Check up to N keys drawn from the origin keyspace.
    #[arg(long, value_name = "N", conflicts_with_all = ["full", "key"])]
    pub sample: Option<usize>,

    /// Check every key present in either store.
    #[arg(long, conflicts_with = "key")]
    pub full: bool,

    /// Check this key (repeatable). Keys are checked in the order given.
    #[arg(long, value_name = "KEY")]
    pub key: Vec<String>,

    /// Print the result without writing a report file.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Args)]
pub struct RunArgs {
    /// Number of demo records to dual-write.
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub records: usize,

    /// Write mode (defaults to session.write_mode).
    #[arg(long)]
    pub mode: Option<WriteMode>,

    /// Validate up to N of the records written by this run.
    #[arg(long, value_name = "N", conflicts_with = "full")]
    pub sample: Option<usize>,

    /// Validate every key present in either store.
    #[arg(long)]
    pub full: bool,

    /// Skip writes and the report file; reconcile only.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Args)]
pub struct BackfillArgs {
    /// Records copied concurrently per batch.
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub batch_size: usize,

    /// Count missing records without copying them.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SchemaType {
    SessionReport,
    Summary,
    ConsistencyResult,
    Backfill,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Output type to describe.
    #[arg(value_enum, default_value = "session-report")]
    pub type_name: SchemaType,
}
