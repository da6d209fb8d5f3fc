//! CLI struct definitions for the `archiflow` command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use crate::core::time::parse_date;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "archiflow",
    version = env!("CARGO_PKG_VERSION"),
    about = "ArchiFlow contract store: validated, transactional persistence for client contracts."
)]
pub(crate) struct Cli {
    /// Database file (overrides `database_path` from the config file and ARCHIFLOW_DB).
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,
    /// Config file (defaults to ./archiflow.toml when present).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Output format.
    #[clap(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ContractFields {
    /// Client the contract is with.
    #[clap(long)]
    pub client: Option<String>,
    /// First day of the contract (YYYY-MM-DD).
    #[clap(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,
    /// Last day of the contract (YYYY-MM-DD).
    #[clap(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,
    /// Contract value.
    #[clap(long)]
    pub value: Option<f64>,
    /// Draft, Active, Completed, Expired or Cancelled.
    #[clap(long)]
    pub status: Option<String>,
    #[clap(long)]
    pub description: Option<String>,
    /// Payment terms in days.
    #[clap(long)]
    pub payment_terms: Option<i32>,
    /// Whether the contract carries a non-compete clause.
    #[clap(long)]
    pub non_compete: Option<bool>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the database and schema if missing
    Init,
    /// Add a contract
    Add {
        /// Explicit id (generated when omitted)
        #[clap(long)]
        id: Option<String>,
        #[clap(flatten)]
        fields: ContractFields,
    },
    /// Show one contract
    Get { id: String },
    /// List contracts, optionally filtered
    List {
        #[clap(long)]
        status: Option<String>,
        /// Substring match on client name
        #[clap(long)]
        client: Option<String>,
        /// Overlap window start (YYYY-MM-DD)
        #[clap(long, value_parser = parse_date, requires = "to")]
        from: Option<NaiveDate>,
        /// Overlap window end (YYYY-MM-DD)
        #[clap(long, value_parser = parse_date, requires = "from")]
        to: Option<NaiveDate>,
        #[clap(long, requires = "max_value")]
        min_value: Option<f64>,
        #[clap(long, requires = "min_value")]
        max_value: Option<f64>,
    },
    /// Case-insensitive search over client, description and status
    Search { term: String },
    /// Change fields of an existing contract
    Update {
        id: String,
        #[clap(flatten)]
        fields: ContractFields,
        /// Remove the description
        #[clap(long, conflicts_with = "description")]
        clear_description: bool,
    },
    /// Delete contracts (Active contracts are refused)
    Delete {
        #[clap(required = true)]
        ids: Vec<String>,
    },
    /// Totals, status distribution and monthly counts
    Stats,
    /// Active contracts ending soon
    Expiring {
        /// Window in days (defaults to `expiring_threshold_days`)
        #[clap(long)]
        days: Option<i64>,
    },
    /// Expire overdue Active contracts and purge incomplete rows
    Sync,
    /// VACUUM, REINDEX and ANALYZE the database
    Optimize,
    /// Copy the database to a file and write a checksum next to it
    Backup { destination: PathBuf },
    /// Replace the database with a backup
    Restore { backup: PathBuf },
    /// Write every contract to a JSON file
    Export { path: PathBuf },
    /// Add contracts from a JSON array file, one by one
    Import { path: PathBuf },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init => "init",
            Command::Add { .. } => "add",
            Command::Get { .. } => "get",
            Command::List { .. } => "list",
            Command::Search { .. } => "search",
            Command::Update { .. } => "update",
            Command::Delete { .. } => "delete",
            Command::Stats => "stats",
            Command::Expiring { .. } => "expiring",
            Command::Sync => "sync",
            Command::Optimize => "optimize",
            Command::Backup { .. } => "backup",
            Command::Restore { .. } => "restore",
            Command::Export { .. } => "export",
            Command::Import { .. } => "import",
        }
    }
}
