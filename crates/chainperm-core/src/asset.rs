//! The single record type managed by the asset-store chaincode.

use serde::{Deserialize, Serialize};

/// An approval record stored in world state under an external id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub approvement: bool,
    pub approver: String,
}

impl Asset {
    pub fn new(approvement: bool, approver: impl Into<String>) -> Self {
        Self {
            approvement,
            approver: approver.into(),
        }
    }

    /// Serialize to the JSON bytes stored in world state and carried in events.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_matches_ledger_format() {
        let asset = Asset::new(true, "alice");
        let json = String::from_utf8(asset.to_bytes().unwrap()).unwrap();
        assert_eq!(json, r#"{"approvement":true,"approver":"alice"}"#);
    }

    #[test]
    fn rejects_missing_field() {
        assert!(Asset::from_bytes(br#"{"approver":"bob"}"#).is_err());
    }
}
