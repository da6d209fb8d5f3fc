//! Read-through cache of contracts keyed by id.
//!
//! Entries are private copies: `get` hands out clones and `insert` stores a
//! clone, so caller mutation never reaches the cache. Without a capacity the
//! map grows with every distinct id read; with one, the oldest insertion is
//! evicted first.

use crate::contracts::model::Contract;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct ContractCache {
    enabled: bool,
    capacity: Option<usize>,
    entries: FxHashMap<String, Contract>,
    order: VecDeque<String>,
}

impl ContractCache {
    pub fn new(enabled: bool, capacity: Option<usize>) -> Self {
        Self {
            enabled,
            capacity,
            entries: FxHashMap::default(),
            order: VecDeque::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disabling drops every entry so a later re-enable starts cold.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.clear();
        }
    }

    pub fn get(&self, id: &str) -> Option<Contract> {
        if !self.enabled {
            return None;
        }
        self.entries.get(id).cloned()
    }

    pub fn insert(&mut self, contract: &Contract) {
        if !self.enabled {
            return;
        }
        if self
            .entries
            .insert(contract.id.clone(), contract.clone())
            .is_some()
        {
            return;
        }
        self.order.push_back(contract.id.clone());
        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn invalidate(&mut self, id: &str) {
        if self.entries.remove(id).is_some() {
            self.order.retain(|cached| cached != id);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }
}
