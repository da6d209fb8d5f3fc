//! JSON export and import of contracts.
//!
//! Import is per-item: each element is added on its own, so
//! valid contracts are kept even when others in the same file are rejected.
//! Callers that need all-or-nothing semantics use `add_contracts` instead.

use crate::contracts::batch::BatchFailure;
use crate::contracts::model::Contract;
use crate::contracts::store::ContractStore;
use crate::core::error::{ArchiflowError, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub failures: Vec<BatchFailure>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} of {} contracts",
            self.imported.len(),
            self.imported.len() + self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  #{}: {}", failure.index, failure.reason)?;
        }
        Ok(())
    }
}

pub fn export_contracts_json(store: &ContractStore) -> Result<JsonValue> {
    let contracts = store.get_all_contracts()?;
    Ok(JsonValue::Array(
        contracts.iter().map(Contract::to_json).collect(),
    ))
}

pub fn export_to_file(store: &ContractStore, path: &Path) -> Result<usize> {
    let json = export_contracts_json(store)?;
    let count = json.as_array().map(Vec::len).unwrap_or(0);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&json)?)?;
    info!(path = %path.display(), count, "contracts exported");
    Ok(count)
}

pub fn import_contracts_json(store: &mut ContractStore, json: &JsonValue) -> Result<ImportReport> {
    let items = json.as_array().ok_or_else(|| {
        ArchiflowError::ValidationError("contract import expects a JSON array".to_string())
    })?;
    let mut report = ImportReport::default();
    for (index, item) in items.iter().enumerate() {
        let id = item
            .get("id")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        let outcome = Contract::from_json(item).and_then(|contract| store.add_contract(&contract));
        match outcome {
            Ok(stored) => report.imported.push(stored),
            Err(err) => report.failures.push(BatchFailure {
                index,
                id,
                reason: err.to_string(),
            }),
        }
    }
    info!(
        imported = report.imported.len(),
        failed = report.failures.len(),
        "contract import finished"
    );
    Ok(report)
}

pub fn import_from_file(store: &mut ContractStore, path: &Path) -> Result<ImportReport> {
    let content = fs::read_to_string(path)?;
    let json: JsonValue = serde_json::from_str(&content)?;
    import_contracts_json(store, &json)
}
