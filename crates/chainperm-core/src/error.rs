//! Error types for the ChainPerm contract, gateway, and listener.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by asset-store transaction functions.
///
/// Any of these aborts the transaction: no state write and no event is
/// committed.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("the asset {id} already exists")]
    AlreadyExists { id: String },

    #[error("the asset {id} does not exist")]
    NotFound { id: String },

    #[error("world state error: {0}")]
    State(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("unknown transaction function: {0}")]
    UnknownFunction(String),

    #[error("invalid argument for {function}: {reason}")]
    InvalidArgument { function: String, reason: String },
}

/// Errors from establishing a gateway session or subscription.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway connection failed: {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("failed to start chaincode event listening for {chaincode}: {reason}")]
    Subscription { chaincode: String, reason: String },

    #[error("transaction failed: {0}")]
    Transaction(#[from] ContractError),

    #[error("gateway is closed")]
    Closed,
}

/// Errors raised while turning one chaincode event into a log line, plus the
/// fatal subscription failure.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("malformed payload in transaction {tx_id}: {reason}")]
    MalformedPayload { tx_id: String, reason: String },

    #[error("payload of transaction {tx_id} is not a JSON object: {reason}")]
    Decode { tx_id: String, reason: String },

    #[error("log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode log record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Subscription(#[from] GatewayError),
}

impl ListenerError {
    /// Returns `true` if the listener should drop the event and keep going.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Subscription(_))
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
