//! # chainperm-core
//!
//! Types shared by every ChainPerm crate: the ledger-resident `Asset`, the
//! `ChaincodeEvent` delivered by a gateway subscription, the `LogRecord`
//! written by the event listener, the error taxonomy, and configuration.

pub mod asset;
pub mod config;
pub mod error;
pub mod event;

pub use asset::Asset;
pub use config::{ChainpermConfig, GatewayConfig, ListenerConfig, LogConfig};
pub use error::{ConfigError, ContractError, GatewayError, ListenerError};
pub use event::{ChaincodeEvent, EventKind, LogRecord};
