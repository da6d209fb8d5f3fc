//! ArchiFlow: contract persistence for architecture practices
//!
//! **ArchiFlow keeps client contracts in a single local SQLite file.**
//!
//! Every contract passes entity and store validation before it is written,
//! every mutation runs in its own transaction, and Active contracts cannot be
//! deleted until they are completed or cancelled.
//!
//! # Architecture
//!
//! ## Entity
//!
//! - [`contracts::model::Contract`]: plain value type with validation,
//!   expiry helpers and a camelCase JSON form
//! - [`contracts::model::ContractStatus`]: the closed status vocabulary
//!
//! ## Store
//!
//! - [`contracts::store::ContractStore`]: lifecycle, CRUD and business rules
//! - `batch`: all-or-nothing multi-row add, update and delete
//! - `query`: search, filters and statistics
//! - `maintenance`: status synchronization, optimize, backup and restore
//! - `transfer`: JSON export and per-item import
//!
//! Failures surface as [`core::error::ArchiflowError`]; the store also keeps
//! the last failure message and notifies subscribed
//! [`contracts::events::ContractListener`]s.
//!
//! # Examples
//!
//! ```bash
//! # Create the database
//! archiflow --db ./contracts.db init
//!
//! # Add a contract
//! archiflow add --client "Acme" --start 2024-01-01 --end 2024-12-31 --value 50000 --status Active
//!
//! # Contracts ending in the next two weeks, as JSON
//! archiflow --format json expiring --days 14
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: configuration, errors, logging, schema and connection setup
//! - [`contracts`]: the contract entity and its store

pub mod contracts;
pub mod core;

mod cli;

use cli::{Cli, Command, ContractFields, OutputFormat};
use contracts::model::{Contract, ContractStatus};
use contracts::store::ContractStore;
use contracts::{TracingListener, maintenance, transfer};
use crate::core::config::ArchiflowConfig;
use crate::core::error::ArchiflowError;
use crate::core::{logging, time};

use clap::Parser;
use colored::Colorize;
use serde_json::{Value as JsonValue, json};

struct Outcome {
    json: JsonValue,
    text: String,
}

impl Outcome {
    fn new(json: JsonValue, text: impl Into<String>) -> Self {
        Self {
            json,
            text: text.into(),
        }
    }
}

pub fn run() -> Result<(), ArchiflowError> {
    let cli = Cli::parse();
    let mut config = ArchiflowConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db.clone() {
        config.database_path = Some(db);
    }
    logging::init_logging(&config.log_filter);

    let mut store = ContractStore::new(config);
    store.subscribe(Box::new(TracingListener));
    let cmd = cli.command.name();
    let result = store
        .initialize(None)
        .and_then(|_| dispatch(&mut store, cli.command));
    store.shutdown();

    match (result, cli.format) {
        (Ok(outcome), OutputFormat::Json) => {
            let envelope = time::command_envelope(cmd, "ok", outcome.json);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
        (Ok(outcome), OutputFormat::Text) => {
            if !outcome.text.is_empty() {
                println!("{}", outcome.text);
            }
            Ok(())
        }
        (Err(err), OutputFormat::Json) => {
            let envelope = time::command_envelope(cmd, "error", json!({ "error": err.to_string() }));
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Err(err)
        }
        (Err(err), OutputFormat::Text) => Err(err),
    }
}

fn dispatch(store: &mut ContractStore, command: Command) -> Result<Outcome, ArchiflowError> {
    match command {
        Command::Init => {
            let path = store
                .database_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            Ok(Outcome::new(
                json!({ "path": path }),
                format!("{} contract database ready at {}", "✓".green(), path.bold()),
            ))
        }
        Command::Add { id, fields } => {
            let mut contract = Contract::new();
            contract.id = id.unwrap_or_default();
            apply_fields(&mut contract, fields);
            let stored = store.add_contract(&contract)?;
            Ok(Outcome::new(
                json!({ "id": stored }),
                format!("{} added contract {}", "✓".green(), stored.bold()),
            ))
        }
        Command::Get { id } => {
            let contract = store
                .get_contract(&id)?
                .ok_or_else(|| ArchiflowError::NotFound(format!("contract {}", id)))?;
            let text = render_contract(&contract);
            Ok(Outcome::new(json!({ "contract": contract.to_json() }), text))
        }
        Command::List {
            status,
            client,
            from,
            to,
            min_value,
            max_value,
        } => {
            let contracts = match (status, client, from.zip(to), min_value.zip(max_value)) {
                (Some(status), _, _, _) => store.get_contracts_by_status(&status)?,
                (None, Some(client), _, _) => store.get_contracts_by_client(&client)?,
                (None, None, Some((from, to)), _) => store.get_contracts_by_date_range(from, to)?,
                (None, None, None, Some((min, max))) => store.get_contracts_by_value_range(min, max)?,
                (None, None, None, None) => store.get_all_contracts()?,
            };
            Ok(contract_list(&contracts))
        }
        Command::Search { term } => Ok(contract_list(&store.search_contracts(&term)?)),
        Command::Update {
            id,
            fields,
            clear_description,
        } => {
            let mut contract = store
                .get_contract(&id)?
                .ok_or_else(|| ArchiflowError::NotFound(format!("contract {}", id)))?;
            apply_fields(&mut contract, fields);
            if clear_description {
                contract.description = None;
            }
            store.update_contract(&contract)?;
            Ok(Outcome::new(
                json!({ "id": id }),
                format!("{} updated contract {}", "✓".green(), id.bold()),
            ))
        }
        Command::Delete { ids } => {
            if let [id] = ids.as_slice() {
                store.delete_contract(id)?;
            } else {
                store.delete_contracts(ids.as_slice())?;
            }
            let text = format!("{} deleted {} contract(s)", "✓".green(), ids.len());
            Ok(Outcome::new(json!({ "deleted": ids }), text))
        }
        Command::Stats => {
            let stats = store.get_contract_statistics()?;
            let monthly = store.get_monthly_contract_counts()?;
            let mut text = format!(
                "{}\n  total: {}\n  active: {}\n  expired: {}\n  expiring within {} days: {}\n  total value: {:.2}\n  average value: {:.2}",
                "Contract statistics".bold(),
                stats.total,
                stats.active,
                stats.expired,
                stats.expiring_threshold_days,
                stats.expiring_soon,
                stats.total_value,
                stats.average_value
            );
            text.push_str(&format!("\n{}", "By status".bold()));
            for (status, count) in &stats.by_status {
                text.push_str(&format!("\n  {:<10} {}", status, count));
            }
            if !monthly.is_empty() {
                text.push_str(&format!("\n{}", "By start month".bold()));
                for (month, count) in &monthly {
                    text.push_str(&format!("\n  {} {}", month, count));
                }
            }
            Ok(Outcome::new(
                json!({ "statistics": stats, "monthly": monthly }),
                text,
            ))
        }
        Command::Expiring { days } => {
            let days = days.unwrap_or(store.config().expiring_threshold_days);
            Ok(contract_list(&store.get_expiring_contracts(days)?))
        }
        Command::Sync => {
            let report = store.synchronize_database()?;
            let text = format!(
                "{} synchronized: {} expired, {} incomplete removed",
                "✓".green(),
                report.expired.len(),
                report.removed
            );
            Ok(Outcome::new(json!({ "sync": report }), text))
        }
        Command::Optimize => {
            let report = store.optimize_database()?;
            let mut text = format!("{} optimized: {}", "✓".green(), report.completed.join(", "));
            for (step, reason) in &report.failed {
                text.push_str(&format!("\n  {} {}: {}", "✗".red(), step, reason));
            }
            Ok(Outcome::new(json!({ "optimize": report }), text))
        }
        Command::Backup { destination } => {
            let report = store.backup_database(&destination)?;
            let text = format!(
                "{} backed up {} bytes to {}\n  sha256 {}",
                "✓".green(),
                report.bytes,
                report.path.display(),
                report.sha256.dimmed()
            );
            Ok(Outcome::new(
                json!({
                    "backup": report,
                    "checksum_file": maintenance::checksum_path(&destination),
                }),
                text,
            ))
        }
        Command::Restore { backup } => {
            store.restore_database(&backup)?;
            let count = store.contract_count()?;
            Ok(Outcome::new(
                json!({ "restored_from": backup, "count": count }),
                format!(
                    "{} restored {} contract(s) from {}",
                    "✓".green(),
                    count,
                    backup.display()
                ),
            ))
        }
        Command::Export { path } => {
            let count = transfer::export_to_file(store, &path)?;
            Ok(Outcome::new(
                json!({ "path": path, "count": count }),
                format!("{} exported {} contract(s) to {}", "✓".green(), count, path.display()),
            ))
        }
        Command::Import { path } => {
            let report = transfer::import_from_file(store, &path)?;
            let marker = if report.is_clean() {
                "✓".green()
            } else {
                "!".yellow()
            };
            let text = format!("{} {}", marker, report);
            Ok(Outcome::new(json!({ "import": report }), text))
        }
    }
}

fn apply_fields(contract: &mut Contract, fields: ContractFields) {
    if let Some(client) = fields.client {
        contract.client_name = client;
    }
    if let Some(start) = fields.start {
        contract.start_date = start;
    }
    if let Some(end) = fields.end {
        contract.end_date = end;
    }
    if let Some(value) = fields.value {
        contract.value = value;
    }
    if let Some(status) = fields.status {
        contract.status = status;
    }
    if let Some(description) = fields.description {
        contract.description = Some(description);
    }
    if let Some(terms) = fields.payment_terms {
        contract.payment_terms = terms;
    }
    if let Some(non_compete) = fields.non_compete {
        contract.has_non_compete_clause = non_compete;
    }
}

fn contract_list(contracts: &[Contract]) -> Outcome {
    let json = json!({
        "count": contracts.len(),
        "contracts": contracts.iter().map(Contract::to_json).collect::<Vec<_>>(),
    });
    if contracts.is_empty() {
        return Outcome::new(json, "No contracts found".dimmed().to_string());
    }
    let lines: Vec<String> = contracts
        .iter()
        .map(|c| {
            format!(
                "{}  {:<24} {} .. {}  {:>12.2}  {}",
                c.id.dimmed(),
                c.client_name,
                c.start_date,
                c.end_date,
                c.value,
                colored_status(&c.status)
            )
        })
        .collect();
    Outcome::new(json, lines.join("\n"))
}

fn render_contract(c: &Contract) -> String {
    let mut text = format!(
        "{} {}\n  client: {}\n  period: {} .. {} ({} days left)\n  value: {:.2}\n  status: {}\n  payment terms: {} days\n  non-compete: {}",
        "Contract".bold(),
        c.id,
        c.client_name,
        c.start_date,
        c.end_date,
        c.days_until_expiry(),
        c.value,
        colored_status(&c.status),
        c.payment_terms,
        if c.has_non_compete_clause { "yes" } else { "no" }
    );
    if let Some(description) = &c.description {
        text.push_str(&format!("\n  description: {}", description));
    }
    text
}

fn colored_status(status: &str) -> String {
    match status.parse::<ContractStatus>() {
        Ok(ContractStatus::Active) => status.green().to_string(),
        Ok(ContractStatus::Draft) => status.yellow().to_string(),
        Ok(ContractStatus::Completed) => status.blue().to_string(),
        Ok(ContractStatus::Expired) => status.red().to_string(),
        Ok(ContractStatus::Cancelled) => status.dimmed().to_string(),
        Err(_) => status.to_string(),
    }
}
