//! Runtime configuration.
//!
//! Every field defaults to the value the client historically hard-coded, so an
//! empty YAML document is a valid configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Gateway endpoint, identity, and platform timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Event relay endpoint, e.g. "ws://localhost:7051/events"
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// MSP id of the client identity
    #[serde(default = "default_msp_id")]
    pub msp_id: String,
    /// Path to the client certificate (PEM); opaque to this crate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,
    #[serde(default = "default_evaluate_ms")]
    pub evaluate_timeout_ms: u64,
    #[serde(default = "default_endorse_ms")]
    pub endorse_timeout_ms: u64,
    #[serde(default = "default_submit_ms")]
    pub submit_timeout_ms: u64,
    #[serde(default = "default_commit_status_ms")]
    pub commit_status_timeout_ms: u64,
}

fn default_endpoint() -> String { "ws://localhost:7051/events".into() }
fn default_msp_id() -> String { "Org1MSP".into() }
fn default_evaluate_ms() -> u64 { 5_000 }
fn default_endorse_ms() -> u64 { 15_000 }
fn default_submit_ms() -> u64 { 5_000 }
fn default_commit_status_ms() -> u64 { 60_000 }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            msp_id: default_msp_id(),
            cert_path: None,
            evaluate_timeout_ms: default_evaluate_ms(),
            endorse_timeout_ms: default_endorse_ms(),
            submit_timeout_ms: default_submit_ms(),
            commit_status_timeout_ms: default_commit_status_ms(),
        }
    }
}

/// Which events to listen for and where to log them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_chaincode")]
    pub chaincode: String,
    /// Smart-contract name inside the chaincode package
    #[serde(default = "default_contract")]
    pub contract: String,
    /// Label written to every record's `scname` field
    #[serde(default = "default_scname")]
    pub scname: String,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

fn default_channel() -> String { "mychannel".into() }
fn default_chaincode() -> String { "basic".into() }
fn default_contract() -> String { "dollartransfer".into() }
fn default_scname() -> String { "code_permission".into() }
fn default_log_path() -> PathBuf { PathBuf::from("/shared_data/contract.log") }

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            chaincode: default_chaincode(),
            contract: default_contract(),
            scname: default_scname(),
            log_path: default_log_path(),
        }
    }
}

/// Log level per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: component_name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String { "info".into() }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainpermConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl ChainpermConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = ChainpermConfig::from_yaml_str("").unwrap();
        assert_eq!(cfg.listener.channel, "mychannel");
        assert_eq!(cfg.listener.chaincode, "basic");
        assert_eq!(cfg.listener.scname, "code_permission");
        assert_eq!(cfg.listener.log_path, PathBuf::from("/shared_data/contract.log"));
        assert_eq!(cfg.gateway.endorse_timeout_ms, 15_000);
        assert_eq!(cfg.gateway.commit_status_timeout_ms, 60_000);
    }

    #[test]
    fn partial_override() {
        let yaml = r#"
listener:
  chaincode: permission
  log_path: /tmp/contract.log
log:
  level: debug
  components:
    chainperm_listener: trace
"#;
        let cfg = ChainpermConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.listener.chaincode, "permission");
        assert_eq!(cfg.listener.channel, "mychannel");
        assert_eq!(cfg.listener.log_path, PathBuf::from("/tmp/contract.log"));
        assert_eq!(cfg.log.level, "debug");
        assert_eq!(cfg.log.components["chainperm_listener"], "trace");
        assert_eq!(cfg.gateway, GatewayConfig::default());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ChainpermConfig::from_file("/nonexistent/chainperm.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
