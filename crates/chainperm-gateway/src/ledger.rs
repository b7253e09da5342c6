//! `InMemoryLedger`: an in-process ledger hosting the asset-store chaincode.
//!
//! Transactions run one at a time against a `MemoryWorldState`. A successful
//! transaction commits its writes, advances the block height by one, and
//! hands its event to every live subscriber of the chaincode. A failed
//! transaction commits nothing and emits nothing.

use crate::gateway::{Gateway, Network};
use crate::subscription::{ChaincodeEventStream, EventSender};
use async_trait::async_trait;
use chainperm_contract::{AssetContract, MemoryWorldState};
use chainperm_core::{error::GatewayError, event::ChaincodeEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Outcome of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatus {
    pub transaction_id: String,
    pub block_number: u64,
    /// JSON result returned by the transaction function (empty for mutations)
    pub result: Vec<u8>,
}

struct Subscriber {
    chaincode: String,
    sender: EventSender,
}

#[derive(Default)]
struct LedgerState {
    height: u64,
    subscribers: Vec<Subscriber>,
}

struct LedgerInner {
    channel: String,
    chaincode: String,
    contract: AssetContract,
    world: MemoryWorldState,
    state: Mutex<LedgerState>,
    closed: AtomicBool,
}

/// In-process ledger with one channel and one deployed chaincode.
#[derive(Clone)]
pub struct InMemoryLedger {
    inner: Arc<LedgerInner>,
}

impl InMemoryLedger {
    pub fn new(channel: impl Into<String>, chaincode: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                channel: channel.into(),
                chaincode: chaincode.into(),
                contract: AssetContract::new(),
                world: MemoryWorldState::new(),
                state: Mutex::new(LedgerState::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The committed world state.
    pub fn world(&self) -> &MemoryWorldState {
        &self.inner.world
    }

    /// Current block height (number of committed transactions).
    pub fn height(&self) -> u64 {
        self.inner.state.lock().unwrap().height
    }

    /// Run a transaction function and commit it.
    pub fn submit(&self, function: &str, args: &[&str]) -> Result<CommitStatus, GatewayError> {
        if self.is_closed() {
            return Err(GatewayError::Closed);
        }
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();

        // Held across execute + commit + delivery so commit order is delivery order.
        let mut state = self.inner.state.lock().unwrap();

        let tx_id = new_tx_id();
        let mut tx = self.inner.world.begin(tx_id.clone());
        let result = match self.inner.contract.invoke(&mut tx, function, &args) {
            Ok(result) => result,
            Err(e) => {
                warn!(tx = %tx_id, function, error = %e, "transaction rejected");
                return Err(e.into());
            }
        };
        let staged = tx.commit();

        state.height += 1;
        let block_number = state.height;
        info!(tx = %tx_id, function, block = block_number, "transaction committed");

        if let Some(staged) = staged {
            let event = ChaincodeEvent::new(tx_id.clone(), staged.name, staged.payload)
                .with_origin(self.inner.chaincode.clone(), block_number);
            let chaincode = &self.inner.chaincode;
            state.subscribers.retain(|sub| {
                if &sub.chaincode != chaincode {
                    return !sub.sender.is_closed();
                }
                sub.sender.send(event.clone())
            });
            debug!(tx = %tx_id, subscribers = state.subscribers.len(), "event delivered");
        }

        Ok(CommitStatus {
            transaction_id: tx_id,
            block_number,
            result,
        })
    }

    /// Run a transaction function without committing it.
    pub fn evaluate(&self, function: &str, args: &[&str]) -> Result<Vec<u8>, GatewayError> {
        if self.is_closed() {
            return Err(GatewayError::Closed);
        }
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut tx = self.inner.world.begin(new_tx_id());
        Ok(self.inner.contract.invoke(&mut tx, function, &args)?)
    }
}

fn new_tx_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl Gateway for InMemoryLedger {
    fn network(&self, channel: &str) -> Arc<dyn Network> {
        Arc::new(LedgerNetwork {
            inner: Arc::clone(&self.inner),
            channel: channel.to_string(),
        })
    }

    async fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            // Dropping the senders ends every open stream.
            self.inner.state.lock().unwrap().subscribers.clear();
            info!(channel = %self.inner.channel, "in-memory ledger closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

struct LedgerNetwork {
    inner: Arc<LedgerInner>,
    channel: String,
}

#[async_trait]
impl Network for LedgerNetwork {
    fn name(&self) -> &str {
        &self.channel
    }

    async fn chaincode_events(
        &self,
        chaincode_id: &str,
    ) -> Result<ChaincodeEventStream, GatewayError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(GatewayError::Closed);
        }
        if self.channel != self.inner.channel {
            return Err(GatewayError::Subscription {
                chaincode: chaincode_id.to_string(),
                reason: format!("channel {} not found", self.channel),
            });
        }

        let (sender, stream) = ChaincodeEventStream::channel();
        self.inner.state.lock().unwrap().subscribers.push(Subscriber {
            chaincode: chaincode_id.to_string(),
            sender,
        });
        debug!(channel = %self.channel, chaincode = chaincode_id, "subscriber registered");
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainperm_core::{asset::Asset, error::ContractError};

    #[tokio::test]
    async fn committed_event_reaches_subscriber() {
        let ledger = InMemoryLedger::new("mychannel", "basic");
        let mut events = ledger
            .network("mychannel")
            .chaincode_events("basic")
            .await
            .unwrap();

        let status = ledger.submit("CreateAsset", &["a1", "true", "alice"]).unwrap();
        assert_eq!(status.block_number, 1);

        let event = events.next().await.unwrap();
        assert_eq!(event.transaction_id, status.transaction_id);
        assert_eq!(event.event_name, "CreateAsset");
        assert_eq!(event.chaincode_name, "basic");
        assert_eq!(event.block_number, 1);
        assert_eq!(Asset::from_bytes(&event.payload).unwrap(), Asset::new(true, "alice"));
    }

    #[tokio::test]
    async fn failed_transaction_emits_nothing() {
        let ledger = InMemoryLedger::new("mychannel", "basic");
        let mut events = ledger
            .network("mychannel")
            .chaincode_events("basic")
            .await
            .unwrap();

        let err = ledger.submit("UpdateAsset", &["a1", "false", "bob"]).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Transaction(ContractError::NotFound { .. })
        ));
        assert_eq!(ledger.height(), 0);
        assert!(ledger.world().is_empty());

        ledger.close().await;
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn other_chaincode_subscribers_are_skipped() {
        let ledger = InMemoryLedger::new("mychannel", "basic");
        let network = ledger.network("mychannel");
        let mut other = network.chaincode_events("other").await.unwrap();
        let mut basic = network.chaincode_events("basic").await.unwrap();

        ledger.submit("CreateAsset", &["a1", "true", "alice"]).unwrap();
        assert!(basic.next().await.is_some());

        ledger.close().await;
        assert!(other.next().await.is_none());
    }

    #[tokio::test]
    async fn unknown_channel_fails_subscription() {
        let ledger = InMemoryLedger::new("mychannel", "basic");
        let err = ledger
            .network("otherchannel")
            .chaincode_events("basic")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Subscription { .. }));
    }

    #[tokio::test]
    async fn closed_ledger_refuses_work() {
        let ledger = InMemoryLedger::new("mychannel", "basic");
        ledger.close().await;
        ledger.close().await;
        assert!(ledger.is_closed());
        assert!(matches!(
            ledger.submit("CreateAsset", &["a1", "true", "alice"]),
            Err(GatewayError::Closed)
        ));
        assert!(ledger.network("mychannel").chaincode_events("basic").await.is_err());
    }

    #[test]
    fn evaluate_does_not_commit() {
        let ledger = InMemoryLedger::new("mychannel", "basic");
        ledger.submit("CreateAsset", &["a1", "true", "alice"]).unwrap();

        let out = ledger.evaluate("ReadAsset", &["a1"]).unwrap();
        assert_eq!(Asset::from_bytes(&out).unwrap(), Asset::new(true, "alice"));

        ledger.evaluate("DeleteAsset", &["a1"]).unwrap();
        assert!(ledger.world().get("a1").is_some());
        assert_eq!(ledger.height(), 1);
    }
}
