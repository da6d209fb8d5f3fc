//! `ContractStore`: the single source of truth for contract rows.
//!
//! Every public method is one atomic unit. Mutations run inside their own
//! transaction and either commit entirely or leave the table untouched.
//! Failures are returned as `ArchiflowError` and mirrored into
//! [`ContractStore::last_error`]; storage-class failures are also pushed to
//! listeners through `on_database_error`.
//!
//! Batch operations live in `batch.rs`, read-only queries in `query.rs` and
//! maintenance in `maintenance.rs`; all of them extend this type.

use crate::contracts::cache::ContractCache;
use crate::contracts::events::{ContractEvent, ContractListener};
use crate::contracts::model::{self, Contract, ContractStatus, DEFAULT_PAYMENT_TERMS};
use crate::core::config::ArchiflowConfig;
use crate::core::db;
use crate::core::error::{ArchiflowError, Result};
use crate::core::schemas;
use crate::core::time;
use rusqlite::{Connection, OptionalExtension, Params, Row, params};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct ContractStore {
    config: ArchiflowConfig,
    pub(crate) conn: Option<Connection>,
    pub(crate) db_path: Option<PathBuf>,
    pub(crate) cache: RefCell<ContractCache>,
    listeners: Vec<Box<dyn ContractListener>>,
    last_error: RefCell<Option<String>>,
}

impl ContractStore {
    pub fn new(config: ArchiflowConfig) -> Self {
        let cache = ContractCache::new(config.cache_enabled, config.cache_capacity);
        Self {
            config,
            conn: None,
            db_path: None,
            cache: RefCell::new(cache),
            listeners: Vec::new(),
            last_error: RefCell::new(None),
        }
    }

    /// Build a store and initialize it at `path` in one step.
    pub fn open(path: &Path, config: ArchiflowConfig) -> Result<Self> {
        let mut store = Self::new(config);
        store.initialize(Some(path))?;
        Ok(store)
    }

    pub fn config(&self) -> &ArchiflowConfig {
        &self.config
    }

    pub fn subscribe(&mut self, listener: Box<dyn ContractListener>) {
        self.listeners.push(listener);
    }

    // ── Connection lifecycle ────────────────────────────────────

    /// Open (creating if absent) the database and ensure the schema.
    ///
    /// `None` or an empty path falls back to the configured location, then to
    /// the per-user data directory. Calling this on an open store is a no-op.
    pub fn initialize(&mut self, path: Option<&Path>) -> Result<()> {
        let result = self.initialize_inner(path);
        self.track_write(result)
    }

    pub(crate) fn initialize_inner(&mut self, path: Option<&Path>) -> Result<()> {
        if self.conn.is_some() {
            debug!("contract store already initialized");
            return Ok(());
        }
        let db_path = path
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.resolved_database_path());
        db::ensure_parent_dir(&db_path)?;
        let conn = db::db_connect(&db_path, &self.config)?;
        db::ensure_schema(&conn)?;
        info!(path = %db_path.display(), "contract database initialized");
        self.conn = Some(conn);
        self.db_path = Some(db_path);
        Ok(())
    }

    /// Close the connection. Safe to call on a closed store.
    pub fn shutdown(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "closing contract database reported an error");
            }
            self.cache.borrow_mut().clear();
            info!("contract database closed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.conn.is_some()
    }

    /// Path of the open database, or of the last one opened.
    pub fn database_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.borrow().clone()
    }

    // ── Cache controls ──────────────────────────────────────────

    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache.get_mut().set_enabled(enabled);
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache.borrow().is_enabled()
    }

    pub fn clear_cache(&mut self) {
        self.cache.get_mut().clear();
    }

    pub fn cached_contracts(&self) -> usize {
        self.cache.borrow().len()
    }

    // ── Single-row CRUD ─────────────────────────────────────────

    /// Validate and insert `contract`, returning the id it was stored under.
    ///
    /// An empty id is replaced by a freshly generated unique one; a supplied id
    /// that already exists is rejected with `DuplicateId`.
    pub fn add_contract(&mut self, contract: &Contract) -> Result<String> {
        let result = self.add_contract_inner(contract);
        self.track_write(result)
    }

    fn add_contract_inner(&mut self, contract: &Contract) -> Result<String> {
        Self::validate_contract(contract)?;
        let conn = self.conn.as_mut().ok_or(ArchiflowError::NotInitialized)?;
        let tx = conn.transaction()?;
        let id = if contract.id.is_empty() {
            generate_unique_id(&tx)?
        } else if contract_exists_in(&tx, &contract.id)? {
            return Err(ArchiflowError::DuplicateId(contract.id.clone()));
        } else {
            contract.id.clone()
        };
        insert_contract(&tx, &id, contract)?;
        tx.commit()?;
        debug!(contract_id = %id, client = %contract.client_name, "contract inserted");
        self.emit(ContractEvent::Added(id.clone()));
        Ok(id)
    }

    /// Fetch a contract by id. The caller always receives its own copy.
    pub fn get_contract(&self, id: &str) -> Result<Option<Contract>> {
        let result = self.get_contract_inner(id);
        self.track(result)
    }

    fn get_contract_inner(&self, id: &str) -> Result<Option<Contract>> {
        if id.is_empty() {
            return Ok(None);
        }
        if let Some(hit) = self.cache.borrow().get(id) {
            return Ok(Some(hit));
        }
        let found = fetch_contract(self.conn()?, id)?;
        if let Some(contract) = &found {
            self.cache.borrow_mut().insert(contract);
        }
        Ok(found)
    }

    pub fn contract_exists(&self, id: &str) -> Result<bool> {
        let result = self.conn().and_then(|conn| contract_exists_in(conn, id));
        self.track(result)
    }

    pub fn update_contract(&mut self, contract: &Contract) -> Result<()> {
        let result = self.update_contract_inner(contract);
        self.track_write(result)
    }

    fn update_contract_inner(&mut self, contract: &Contract) -> Result<()> {
        if contract.id.is_empty() {
            return Err(ArchiflowError::ValidationError(
                "Contract id is required for update".to_string(),
            ));
        }
        Self::validate_contract(contract)?;
        let conn = self.conn.as_mut().ok_or(ArchiflowError::NotInitialized)?;
        let tx = conn.transaction()?;
        if !contract_exists_in(&tx, &contract.id)? {
            return Err(ArchiflowError::NotFound(format!("contract {}", contract.id)));
        }
        update_row(&tx, contract)?;
        self.cache.get_mut().invalidate(&contract.id);
        tx.commit()?;
        debug!(contract_id = %contract.id, "contract updated");
        self.emit(ContractEvent::Updated(contract.id.clone()));
        Ok(())
    }

    /// Delete a contract. Active contracts must be completed or cancelled first.
    pub fn delete_contract(&mut self, id: &str) -> Result<()> {
        let result = self.delete_contract_inner(id);
        self.track_write(result)
    }

    fn delete_contract_inner(&mut self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(ArchiflowError::ValidationError(
                "Contract id is required for delete".to_string(),
            ));
        }
        let conn = self.conn.as_mut().ok_or(ArchiflowError::NotInitialized)?;
        let tx = conn.transaction()?;
        let status =
            fetch_status(&tx, id)?.ok_or_else(|| ArchiflowError::NotFound(format!("contract {}", id)))?;
        check_deletable(id, &status)?;
        delete_row(&tx, id)?;
        self.cache.get_mut().invalidate(id);
        tx.commit()?;
        debug!(contract_id = %id, "contract deleted");
        self.emit(ContractEvent::Deleted(id.to_string()));
        Ok(())
    }

    // ── Business rules ──────────────────────────────────────────

    /// Store-level validation, stricter than [`Contract::is_valid`]: the status
    /// must belong to the vocabulary and payment terms must not be negative.
    pub fn validate_contract(contract: &Contract) -> Result<()> {
        let mut errors = contract.validation_errors();
        if !contract.status.trim().is_empty() && contract.status_kind().is_none() {
            errors.push(format!(
                "Status '{}' is not one of {}",
                contract.status,
                model::available_statuses().join(", ")
            ));
        }
        if contract.payment_terms < 0 {
            errors.push(format!(
                "Payment terms must be zero or more days, got {}",
                contract.payment_terms
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ArchiflowError::ValidationError(errors.join("; ")))
        }
    }

    pub fn can_delete_contract(contract: &Contract) -> bool {
        !contract.has_status(ContractStatus::Active)
    }

    // ── Shared plumbing for the sibling modules ─────────────────

    pub(crate) fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(ArchiflowError::NotInitialized)
    }

    pub(crate) fn emit(&self, event: ContractEvent) {
        for listener in &self.listeners {
            match &event {
                ContractEvent::Added(id) => listener.on_contract_added(id),
                ContractEvent::Updated(id) => listener.on_contract_updated(id),
                ContractEvent::Deleted(id) => listener.on_contract_deleted(id),
                ContractEvent::DatabaseError(message) => listener.on_database_error(message),
            }
        }
    }

    /// Record a failure without touching a successful result.
    pub(crate) fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.record_error(err);
        }
        result
    }

    /// Like `track`, but a success also clears the last error.
    pub(crate) fn track_write<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => *self.last_error.borrow_mut() = None,
            Err(err) => self.record_error(err),
        }
        result
    }

    fn record_error(&self, err: &ArchiflowError) {
        let message = err.to_string();
        if err.is_database_error() {
            warn!(error = %message, "contract store database failure");
            self.emit(ContractEvent::DatabaseError(message.clone()));
        } else {
            debug!(error = %message, "contract store rejected operation");
        }
        *self.last_error.borrow_mut() = Some(message);
    }
}

pub(crate) fn check_deletable(id: &str, status: &str) -> Result<()> {
    if status == ContractStatus::Active.as_str() {
        return Err(ArchiflowError::BusinessRuleError(format!(
            "contract {} is Active; complete or cancel it before deleting",
            id
        )));
    }
    Ok(())
}

pub(crate) fn select_sql(tail: &str) -> String {
    format!(
        "SELECT {} FROM {} {}",
        schemas::CONTRACT_COLUMNS,
        schemas::CONTRACTS_TABLE,
        tail
    )
}

pub(crate) fn contract_from_row(row: &Row) -> rusqlite::Result<Contract> {
    Ok(Contract {
        id: row.get(0)?,
        client_name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        value: row.get(4)?,
        status: row.get(5)?,
        description: row.get(6)?,
        payment_terms: row
            .get::<_, Option<i32>>(7)?
            .unwrap_or(DEFAULT_PAYMENT_TERMS),
        has_non_compete_clause: row.get::<_, Option<bool>>(8)?.unwrap_or(false),
    })
}

/// Run a contract SELECT, skipping rows that no longer hydrate.
pub(crate) fn query_contracts<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Contract>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        match contract_from_row(row) {
            Ok(contract) => out.push(contract),
            Err(e) => {
                let id: Option<String> = row.get(0).ok();
                warn!(contract_id = ?id, error = %e, "skipping unreadable contract row");
            }
        }
    }
    Ok(out)
}

pub(crate) fn fetch_contract(conn: &Connection, id: &str) -> Result<Option<Contract>> {
    let contract = conn
        .query_row(&select_sql("WHERE id = ?1"), params![id], contract_from_row)
        .optional()?;
    Ok(contract)
}

pub(crate) fn fetch_status(conn: &Connection, id: &str) -> Result<Option<String>> {
    let status = conn
        .query_row(
            "SELECT status FROM contracts WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(status)
}

pub(crate) fn contract_exists_in(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM contracts WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn generate_unique_id(conn: &Connection) -> Result<String> {
    loop {
        let id = time::new_contract_id();
        if !contract_exists_in(conn, &id)? {
            return Ok(id);
        }
    }
}

pub(crate) fn insert_contract(conn: &Connection, id: &str, contract: &Contract) -> Result<()> {
    conn.execute(
        schemas::CONTRACTS_INSERT,
        params![
            id,
            contract.client_name,
            contract.start_date,
            contract.end_date,
            contract.value,
            contract.status,
            contract.description,
            contract.payment_terms,
            contract.has_non_compete_clause
        ],
    )?;
    Ok(())
}

pub(crate) fn update_row(conn: &Connection, contract: &Contract) -> Result<usize> {
    let changed = conn.execute(
        schemas::CONTRACTS_UPDATE,
        params![
            contract.id,
            contract.client_name,
            contract.start_date,
            contract.end_date,
            contract.value,
            contract.status,
            contract.description,
            contract.payment_terms,
            contract.has_non_compete_clause
        ],
    )?;
    Ok(changed)
}

pub(crate) fn delete_row(conn: &Connection, id: &str) -> Result<usize> {
    let changed = conn.execute("DELETE FROM contracts WHERE id = ?1", params![id])?;
    Ok(changed)
}
