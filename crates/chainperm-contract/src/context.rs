//! The ledger capability bundle a transaction function runs against.

use chainperm_core::error::ContractError;

/// An event set by a transaction, published only if the transaction commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

/// State access and event emission bound to one transaction.
///
/// Implemented by the hosting platform's stub; `MemoryTransaction` is the
/// in-process implementation.
pub trait TransactionContext {
    /// Id of the transaction this context is bound to.
    fn tx_id(&self) -> &str;

    /// Read a key. `None` means the key is absent.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, ContractError>;

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), ContractError>;

    fn delete_state(&mut self, key: &str) -> Result<(), ContractError>;

    /// Set the transaction's event. A transaction carries at most one event;
    /// a later call replaces the earlier one.
    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), ContractError>;
}
