//! Change notifications emitted by `ContractStore`.
//!
//! Listeners are called synchronously after the owning operation has
//! committed (or failed). Every method has a no-op default so a listener only
//! implements what it cares about.

use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info};

pub trait ContractListener {
    fn on_contract_added(&self, _id: &str) {}
    fn on_contract_updated(&self, _id: &str) {}
    fn on_contract_deleted(&self, _id: &str) {}
    fn on_database_error(&self, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "snake_case")]
pub enum ContractEvent {
    Added(String),
    Updated(String),
    Deleted(String),
    DatabaseError(String),
}

/// Collects events in memory; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Rc<RefCell<Vec<ContractEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ContractEvent> {
        self.events.borrow().clone()
    }

    pub fn take(&self) -> Vec<ContractEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn push(&self, event: ContractEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl ContractListener for EventRecorder {
    fn on_contract_added(&self, id: &str) {
        self.push(ContractEvent::Added(id.to_string()));
    }
    fn on_contract_updated(&self, id: &str) {
        self.push(ContractEvent::Updated(id.to_string()));
    }
    fn on_contract_deleted(&self, id: &str) {
        self.push(ContractEvent::Deleted(id.to_string()));
    }
    fn on_database_error(&self, message: &str) {
        self.push(ContractEvent::DatabaseError(message.to_string()));
    }
}

/// Mirrors every notification into the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl ContractListener for TracingListener {
    fn on_contract_added(&self, id: &str) {
        info!(contract_id = id, "contract added");
    }
    fn on_contract_updated(&self, id: &str) {
        info!(contract_id = id, "contract updated");
    }
    fn on_contract_deleted(&self, id: &str) {
        info!(contract_id = id, "contract deleted");
    }
    fn on_database_error(&self, message: &str) {
        error!(error = message, "database error");
    }
}
