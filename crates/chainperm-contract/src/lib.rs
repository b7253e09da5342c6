//! # chainperm-contract
//!
//! The asset-store chaincode. Every operation runs against a
//! [`TransactionContext`], the capability bundle the ledger hands to a
//! transaction function: state get/put/delete and event emission.
//!
//! ```text
//! submitter ──invoke("CreateAsset", [id, "true", "alice"])──▶ AssetContract
//!                                                              │
//!                                  get_state / put_state ◀─────┤
//!                                  set_event("CreateAsset") ◀──┘
//! ```
//!
//! [`MemoryWorldState`] is an in-process world state whose transactions
//! stage their writes and commit atomically.

pub mod context;
pub mod contract;
pub mod memory;

pub use context::{StagedEvent, TransactionContext};
pub use contract::AssetContract;
pub use memory::{MemoryTransaction, MemoryWorldState};
