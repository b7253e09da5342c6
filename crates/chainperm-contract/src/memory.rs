//! In-memory world state.
//!
//! Transactions stage their writes and their event; nothing is visible to
//! other transactions until `commit()`. Dropping an uncommitted transaction
//! discards it, which is how a failed transaction function leaves no trace.

use crate::context::{StagedEvent, TransactionContext};
use chainperm_core::error::ContractError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Shared key/value world state. Cloning yields another handle to the same
/// state.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorldState {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction bound to `tx_id`.
    pub fn begin(&self, tx_id: impl Into<String>) -> MemoryTransaction {
        MemoryTransaction {
            world: self.clone(),
            tx_id: tx_id.into(),
            writes: BTreeMap::new(),
            event: None,
        }
    }

    /// Committed value for `key`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().unwrap().get(key).cloned()
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A transaction over `MemoryWorldState`. `None` in `writes` marks a delete.
#[derive(Debug)]
pub struct MemoryTransaction {
    world: MemoryWorldState,
    tx_id: String,
    writes: BTreeMap<String, Option<Vec<u8>>>,
    event: Option<StagedEvent>,
}

impl MemoryTransaction {
    /// The event this transaction would publish on commit.
    pub fn staged_event(&self) -> Option<&StagedEvent> {
        self.event.as_ref()
    }

    /// Apply all staged writes under one lock and return the staged event.
    pub fn commit(self) -> Option<StagedEvent> {
        let mut data = self.world.data.lock().unwrap();
        for (key, value) in self.writes {
            match value {
                Some(v) => {
                    data.insert(key, v);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        self.event
    }
}

impl TransactionContext for MemoryTransaction {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, ContractError> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.clone());
        }
        Ok(self.world.get(key))
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), ContractError> {
        if key.is_empty() {
            return Err(ContractError::State("key must not be empty".into()));
        }
        self.writes.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn delete_state(&mut self, key: &str) -> Result<(), ContractError> {
        self.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), ContractError> {
        if name.is_empty() {
            return Err(ContractError::State("event name must not be empty".into()));
        }
        self.event = Some(StagedEvent {
            name: name.to_string(),
            payload,
        });
        Ok(())
    }
}
