use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    about = "Tally - hierarchical transaction ledger with rollup sums",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the ledger log; overrides the config file
    #[arg(long, global = true, env = "TALLY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a new transaction
    Put(PutArgs),
    /// Show one transaction
    Show(ShowArgs),
    /// Rollup sum of a transaction and its descendants
    Sum(SumArgs),
    /// List transaction ids in a category
    Types(TypesArgs),
    /// Check that the ledger store is reachable
    Health,
    /// Remove a transaction and, optionally, a whole category
    Purge(PurgeArgs),
    /// Rewrite the ledger log without deleted records
    Compact,
}

#[derive(Debug, Args)]
pub struct PutArgs {
    /// Transaction id (positive integer)
    pub id: String,
    #[arg(short, long, allow_negative_numbers = true)]
    pub amount: f64,
    /// Category label
    #[arg(short = 't', long = "type")]
    pub category: String,
    /// Parent transaction id
    #[arg(short, long, allow_negative_numbers = true)]
    pub parent: Option<i64>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Debug, Args)]
pub struct SumArgs {
    pub id: String,
    /// Also list included ids and skipped cycle nodes
    #[arg(long)]
    pub report: bool,
}

#[derive(Debug, Args)]
pub struct TypesArgs {
    pub category: String,
}

#[derive(Debug, Args)]
pub struct PurgeArgs {
    pub id: String,
    /// Also remove every transaction in this category
    #[arg(short = 't', long = "type", default_value = "")]
    pub category: String,
}
