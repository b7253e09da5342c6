//! # chainperm-gateway
//!
//! Client-side access to a permissioned ledger: a [`Gateway`] session scoped
//! to an identity, [`Network`] handles per channel, and cancellable
//! [`ChaincodeEventStream`] subscriptions.
//!
//! ## Implementations
//! - [`WsGateway`] subscribes to a chaincode event relay over WebSocket.
//! - [`InMemoryLedger`] is an in-process ledger that hosts the asset-store
//!   chaincode, commits transactions atomically, and delivers committed
//!   events to subscribers.

pub mod gateway;
pub mod ledger;
pub mod subscription;
pub mod ws;

pub use gateway::{ConnectOptions, Gateway, Identity, Network};
pub use ledger::{CommitStatus, InMemoryLedger};
pub use subscription::{CancelHandle, ChaincodeEventStream, EventSender};
pub use ws::WsGateway;
