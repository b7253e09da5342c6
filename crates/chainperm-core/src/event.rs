//! Chaincode events as delivered by a gateway, and the log record derived
//! from each one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The mutation that produced a chaincode event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    CreateAsset,
    UpdateAsset,
    DeleteAsset,
}

impl EventKind {
    /// Event name as emitted on the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateAsset => "CreateAsset",
            Self::UpdateAsset => "UpdateAsset",
            Self::DeleteAsset => "DeleteAsset",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CreateAsset" => Some(Self::CreateAsset),
            "UpdateAsset" => Some(Self::UpdateAsset),
            "DeleteAsset" => Some(Self::DeleteAsset),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, payload-bearing notification emitted by a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEvent {
    /// Id of the transaction that emitted the event
    pub transaction_id: String,
    /// Event name, e.g. "CreateAsset"
    pub event_name: String,
    /// Raw payload bytes exactly as set by the chaincode
    pub payload: Vec<u8>,
    /// Chaincode that emitted the event
    #[serde(default)]
    pub chaincode_name: String,
    /// Block in which the transaction was committed
    #[serde(default)]
    pub block_number: u64,
}

impl ChaincodeEvent {
    pub fn new(
        transaction_id: impl Into<String>,
        event_name: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            event_name: event_name.into(),
            payload: payload.into(),
            chaincode_name: String::new(),
            block_number: 0,
        }
    }

    pub fn with_origin(mut self, chaincode_name: impl Into<String>, block_number: u64) -> Self {
        self.chaincode_name = chaincode_name.into();
        self.block_number = block_number;
        self
    }

    /// The known mutation kind, if the event name is one the asset store emits.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_name(&self.event_name)
    }
}

/// One line of the contract log file.
///
/// Field order is the serialized key order: `scname`, `txid`, `function`,
/// `assetvalue`. A `null` payload is kept and written as `"assetvalue":null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub scname: String,
    pub txid: String,
    pub function: String,
    pub assetvalue: Option<Map<String, Value>>,
}

impl LogRecord {
    pub fn from_event(
        scname: impl Into<String>,
        event: &ChaincodeEvent,
        assetvalue: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            scname: scname.into(),
            txid: event.transaction_id.clone(),
            function: event.event_name.clone(),
            assetvalue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_names() {
        for kind in [EventKind::CreateAsset, EventKind::UpdateAsset, EventKind::DeleteAsset] {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_name("TransferAsset"), None);
    }

    #[test]
    fn log_record_key_order() {
        let event = ChaincodeEvent::new("tx1", "CreateAsset", br#"{}"#.to_vec());
        let mut value = Map::new();
        value.insert("approvement".into(), Value::Bool(true));
        value.insert("approver".into(), Value::String("alice".into()));

        let record = LogRecord::from_event("code_permission", &event, Some(value));
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(
            line,
            r#"{"scname":"code_permission","txid":"tx1","function":"CreateAsset","assetvalue":{"approvement":true,"approver":"alice"}}"#
        );
    }

    #[test]
    fn null_assetvalue_is_written_as_null() {
        let event = ChaincodeEvent::new("tx2", "UpdateAsset", b"null".to_vec());
        let record = LogRecord::from_event("code_permission", &event, None);
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(
            line,
            r#"{"scname":"code_permission","txid":"tx2","function":"UpdateAsset","assetvalue":null}"#
        );
        let back: LogRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back, record);
    }
}
