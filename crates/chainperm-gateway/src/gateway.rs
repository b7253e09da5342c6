//! The `Gateway` and `Network` traits: the client's view of the ledger.

use crate::subscription::ChaincodeEventStream;
use async_trait::async_trait;
use chainperm_core::{config::GatewayConfig, error::GatewayError};
use std::sync::Arc;
use std::time::Duration;

/// The client identity presented to the gateway.
///
/// Certificate bytes are carried as-is; signing and MSP validation belong to
/// the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub msp_id: String,
    pub certificate: Vec<u8>,
}

impl Identity {
    pub fn new(msp_id: impl Into<String>, certificate: impl Into<Vec<u8>>) -> Self {
        Self {
            msp_id: msp_id.into(),
            certificate: certificate.into(),
        }
    }
}

/// Everything needed to open a gateway session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub endpoint: String,
    pub identity: Identity,
    pub evaluate_timeout: Duration,
    pub endorse_timeout: Duration,
    pub submit_timeout: Duration,
    pub commit_status_timeout: Duration,
}

impl ConnectOptions {
    /// Options with the platform's default timeouts.
    pub fn new(endpoint: impl Into<String>, identity: Identity) -> Self {
        Self {
            endpoint: endpoint.into(),
            identity,
            evaluate_timeout: Duration::from_secs(5),
            endorse_timeout: Duration::from_secs(15),
            submit_timeout: Duration::from_secs(5),
            commit_status_timeout: Duration::from_secs(60),
        }
    }

    /// Build options from configuration, loading the certificate if one is
    /// configured.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let certificate = match &config.cert_path {
            Some(path) => std::fs::read(path).map_err(|e| GatewayError::Connection {
                endpoint: config.endpoint.clone(),
                reason: format!("failed to read certificate {}: {e}", path.display()),
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            endpoint: config.endpoint.clone(),
            identity: Identity::new(config.msp_id.clone(), certificate),
            evaluate_timeout: Duration::from_millis(config.evaluate_timeout_ms),
            endorse_timeout: Duration::from_millis(config.endorse_timeout_ms),
            submit_timeout: Duration::from_millis(config.submit_timeout_ms),
            commit_status_timeout: Duration::from_millis(config.commit_status_timeout_ms),
        })
    }
}

/// A session with the ledger, scoped to one identity.
///
/// Dropping the gateway releases it; `close` does so explicitly and is
/// idempotent.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Handle for a channel.
    fn network(&self, channel: &str) -> Arc<dyn Network>;

    /// End every open subscription and refuse new ones.
    async fn close(&self);

    fn is_closed(&self) -> bool;
}

/// A channel on the ledger.
#[async_trait]
pub trait Network: Send + Sync {
    /// Channel name.
    fn name(&self) -> &str;

    /// Subscribe to events emitted by `chaincode_id`, starting from now.
    async fn chaincode_events(
        &self,
        chaincode_id: &str,
    ) -> Result<ChaincodeEventStream, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let opts = ConnectOptions::new("ws://peer:7051", Identity::new("Org1MSP", vec![]));
        assert_eq!(opts.evaluate_timeout, Duration::from_secs(5));
        assert_eq!(opts.endorse_timeout, Duration::from_secs(15));
        assert_eq!(opts.submit_timeout, Duration::from_secs(5));
        assert_eq!(opts.commit_status_timeout, Duration::from_secs(60));
    }

    #[test]
    fn from_config_matches_defaults() {
        let opts = ConnectOptions::from_config(&GatewayConfig::default()).unwrap();
        assert_eq!(opts.endpoint, "ws://localhost:7051/events");
        assert_eq!(opts.identity.msp_id, "Org1MSP");
        assert!(opts.identity.certificate.is_empty());
        assert_eq!(opts.endorse_timeout, Duration::from_secs(15));
    }

    #[test]
    fn unreadable_certificate_is_connection_error() {
        let config = GatewayConfig {
            cert_path: Some("/nonexistent/cert.pem".into()),
            ..GatewayConfig::default()
        };
        let err = ConnectOptions::from_config(&config).unwrap_err();
        assert!(matches!(err, GatewayError::Connection { .. }));
    }
}
