//! All-or-nothing batch mutations.
//!
//! Each call opens one transaction and checks every element on its own,
//! collecting all per-item failures. Any failure rolls the whole batch back,
//! including elements that were prepared successfully, and the call returns
//! `ArchiflowError::BatchError` carrying the full report. Notifications fire
//! only after a clean commit.

use crate::contracts::events::ContractEvent;
use crate::contracts::model::Contract;
use crate::contracts::store::{
    ContractStore, check_deletable, contract_exists_in, delete_row, fetch_status,
    generate_unique_id, insert_contract, update_row,
};
use crate::core::error::{ArchiflowError, Result};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperation {
    Add,
    Update,
    Delete,
}

impl BatchOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOperation::Add => "add",
            BatchOperation::Update => "update",
            BatchOperation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub operation: BatchOperation,
    pub attempted: usize,
    /// Elements that passed their checks before the batch was rolled back.
    pub prepared: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn new(operation: BatchOperation, attempted: usize) -> Self {
        Self {
            operation,
            attempted,
            prepared: 0,
            failures: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn fail(&mut self, index: usize, id: &str, err: &ArchiflowError) {
        self.failures.push(BatchFailure {
            index,
            id: id.to_string(),
            reason: err.to_string(),
        });
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batch {} rolled back: {} of {} contracts prepared, {} failed",
            self.operation.as_str(),
            self.prepared,
            self.attempted,
            self.failures.len()
        )?;
        for failure in &self.failures {
            let id = if failure.id.is_empty() {
                "<no id>"
            } else {
                failure.id.as_str()
            };
            write!(f, "\n  #{} ({}): {}", failure.index, id, failure.reason)?;
        }
        Ok(())
    }
}

impl ContractStore {
    /// Insert every contract or none of them. Returns the stored ids in input order.
    pub fn add_contracts(&mut self, contracts: &[Contract]) -> Result<Vec<String>> {
        let result = self.add_contracts_inner(contracts);
        self.track_write(result)
    }

    fn add_contracts_inner(&mut self, contracts: &[Contract]) -> Result<Vec<String>> {
        let mut report = BatchReport::new(BatchOperation::Add, contracts.len());
        let conn = self.conn.as_mut().ok_or(ArchiflowError::NotInitialized)?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(contracts.len());

        for (index, contract) in contracts.iter().enumerate() {
            if let Err(err) = ContractStore::validate_contract(contract) {
                report.fail(index, &contract.id, &err);
                continue;
            }
            let id = if contract.id.is_empty() {
                generate_unique_id(&tx)?
            } else if contract_exists_in(&tx, &contract.id)? {
                report.fail(
                    index,
                    &contract.id,
                    &ArchiflowError::DuplicateId(contract.id.clone()),
                );
                continue;
            } else {
                contract.id.clone()
            };
            match insert_contract(&tx, &id, contract) {
                Ok(()) => {
                    report.prepared += 1;
                    ids.push(id);
                }
                Err(err) => report.fail(index, &id, &err),
            }
        }

        if report.has_failures() {
            tx.rollback()?;
            warn!(failed = report.failures.len(), attempted = report.attempted, "batch add rolled back");
            return Err(ArchiflowError::BatchError(report));
        }
        tx.commit()?;
        info!(count = ids.len(), "batch add committed");
        for id in &ids {
            self.emit(ContractEvent::Added(id.clone()));
        }
        Ok(ids)
    }

    /// Update every contract or none of them.
    pub fn update_contracts(&mut self, contracts: &[Contract]) -> Result<()> {
        let result = self.update_contracts_inner(contracts);
        self.track_write(result)
    }

    fn update_contracts_inner(&mut self, contracts: &[Contract]) -> Result<()> {
        let mut report = BatchReport::new(BatchOperation::Update, contracts.len());
        let conn = self.conn.as_mut().ok_or(ArchiflowError::NotInitialized)?;
        let tx = conn.transaction()?;

        for (index, contract) in contracts.iter().enumerate() {
            if contract.id.is_empty() {
                report.fail(
                    index,
                    "",
                    &ArchiflowError::ValidationError("Contract id is required for update".to_string()),
                );
                continue;
            }
            if let Err(err) = ContractStore::validate_contract(contract) {
                report.fail(index, &contract.id, &err);
                continue;
            }
            match contract_exists_in(&tx, &contract.id) {
                Ok(true) => {}
                Ok(false) => {
                    report.fail(
                        index,
                        &contract.id,
                        &ArchiflowError::NotFound(format!("contract {}", contract.id)),
                    );
                    continue;
                }
                Err(err) => {
                    report.fail(index, &contract.id, &err);
                    continue;
                }
            }
            match update_row(&tx, contract) {
                Ok(_) => report.prepared += 1,
                Err(err) => report.fail(index, &contract.id, &err),
            }
        }

        if report.has_failures() {
            tx.rollback()?;
            warn!(failed = report.failures.len(), attempted = report.attempted, "batch update rolled back");
            return Err(ArchiflowError::BatchError(report));
        }
        {
            let cache = self.cache.get_mut();
            for contract in contracts {
                cache.invalidate(&contract.id);
            }
        }
        tx.commit()?;
        info!(count = contracts.len(), "batch update committed");
        for contract in contracts {
            self.emit(ContractEvent::Updated(contract.id.clone()));
        }
        Ok(())
    }

    /// Delete every listed contract or none of them. Active contracts fail the batch.
    pub fn delete_contracts<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let result = self.delete_contracts_inner(ids);
        self.track_write(result)
    }

    fn delete_contracts_inner<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<()> {
        let mut report = BatchReport::new(BatchOperation::Delete, ids.len());
        let conn = self.conn.as_mut().ok_or(ArchiflowError::NotInitialized)?;
        let tx = conn.transaction()?;
        let mut seen = FxHashSet::default();

        for (index, id) in ids.iter().enumerate() {
            let id: &str = id.as_ref();
            if id.is_empty() {
                report.fail(
                    index,
                    id,
                    &ArchiflowError::ValidationError("Contract id is required for delete".to_string()),
                );
                continue;
            }
            if !seen.insert(id) {
                report.fail(
                    index,
                    id,
                    &ArchiflowError::ValidationError(format!("contract {} is repeated in batch", id)),
                );
                continue;
            }
            let status = match fetch_status(&tx, id) {
                Ok(Some(status)) => status,
                Ok(None) => {
                    report.fail(index, id, &ArchiflowError::NotFound(format!("contract {}", id)));
                    continue;
                }
                Err(err) => {
                    report.fail(index, id, &err);
                    continue;
                }
            };
            if let Err(err) = check_deletable(id, &status) {
                report.fail(index, id, &err);
                continue;
            }
            match delete_row(&tx, id) {
                Ok(_) => report.prepared += 1,
                Err(err) => report.fail(index, id, &err),
            }
        }

        if report.has_failures() {
            tx.rollback()?;
            warn!(failed = report.failures.len(), attempted = report.attempted, "batch delete rolled back");
            return Err(ArchiflowError::BatchError(report));
        }
        {
            let cache = self.cache.get_mut();
            for id in ids {
                cache.invalidate(id.as_ref());
            }
        }
        tx.commit()?;
        info!(count = ids.len(), "batch delete committed");
        for id in ids {
            self.emit(ContractEvent::Deleted(id.as_ref().to_string()));
        }
        Ok(())
    }
}
