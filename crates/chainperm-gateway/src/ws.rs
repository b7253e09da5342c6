//! `WsGateway`: a `Gateway` backed by a chaincode event relay reachable over
//! WebSocket.
//!
//! Subscribing opens one WebSocket connection, sends
//!
//! ```json
//! {"method":"chaincode_subscribe","params":{"channel":"mychannel","chaincode":"basic"}}
//! ```
//!
//! and then translates every `chaincode_event` notification into a
//! [`ChaincodeEvent`]:
//!
//! ```json
//! {"method":"chaincode_event","params":{
//!     "txId":"…","eventName":"CreateAsset","chaincodeName":"basic",
//!     "blockNumber":12,"payload":"7b22617070…"}}
//! ```
//!
//! The payload is hex-encoded. Any other message is ignored.

use crate::gateway::{ConnectOptions, Gateway, Network};
use crate::subscription::{CancelHandle, ChaincodeEventStream, EventSender};
use async_trait::async_trait;
use chainperm_core::{error::GatewayError, event::ChaincodeEvent};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

struct Session {
    options: ConnectOptions,
    closed: AtomicBool,
    subscriptions: Mutex<Vec<CancelHandle>>,
}

impl Session {
    fn shutdown(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        for handle in self.subscriptions.lock().unwrap().drain(..) {
            handle.cancel();
        }
        true
    }

    /// Track a new subscription, forgetting those that have already ended.
    fn track(&self, handle: CancelHandle) {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        subscriptions.retain(|h| !h.is_ended());
        subscriptions.push(handle);
    }
}

/// WebSocket gateway session.
pub struct WsGateway {
    session: Arc<Session>,
}

impl WsGateway {
    /// Validate the endpoint and open a session.
    ///
    /// Like a gRPC dial, this does not touch the network; connection errors
    /// surface when a subscription is opened.
    pub fn connect(options: ConnectOptions) -> Result<Self, GatewayError> {
        let url = url::Url::parse(&options.endpoint).map_err(|e| GatewayError::Connection {
            endpoint: options.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(GatewayError::Connection {
                endpoint: options.endpoint.clone(),
                reason: format!("unsupported scheme '{}', expected ws or wss", url.scheme()),
            });
        }

        info!(
            endpoint = %options.endpoint,
            msp_id = %options.identity.msp_id,
            "gateway session opened"
        );
        Ok(Self {
            session: Arc::new(Session {
                options,
                closed: AtomicBool::new(false),
                subscriptions: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.session.options.endpoint
    }
}

impl Drop for WsGateway {
    fn drop(&mut self) {
        self.session.shutdown();
    }
}

#[async_trait]
impl Gateway for WsGateway {
    fn network(&self, channel: &str) -> Arc<dyn Network> {
        Arc::new(WsNetwork {
            session: Arc::clone(&self.session),
            channel: channel.to_string(),
        })
    }

    async fn close(&self) {
        if self.session.shutdown() {
            info!(endpoint = %self.session.options.endpoint, "gateway session closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.session.closed.load(Ordering::SeqCst)
    }
}

struct WsNetwork {
    session: Arc<Session>,
    channel: String,
}

#[async_trait]
impl Network for WsNetwork {
    fn name(&self) -> &str {
        &self.channel
    }

    async fn chaincode_events(
        &self,
        chaincode_id: &str,
    ) -> Result<ChaincodeEventStream, GatewayError> {
        if self.session.closed.load(Ordering::SeqCst) {
            return Err(GatewayError::Closed);
        }
        let endpoint = &self.session.options.endpoint;
        let subscription_error = |reason: String| GatewayError::Subscription {
            chaincode: chaincode_id.to_string(),
            reason,
        };

        let handshake = tokio::time::timeout(
            self.session.options.evaluate_timeout,
            connect_async(endpoint.as_str()),
        )
        .await
        .map_err(|_| subscription_error(format!("timed out connecting to {endpoint}")))?;
        let (ws, _) = handshake.map_err(|e| subscription_error(e.to_string()))?;
        info!(endpoint = %endpoint, "WebSocket connected");

        let (mut write, read) = ws.split();
        let sub_msg = serde_json::json!({
            "method": "chaincode_subscribe",
            "params": { "channel": self.channel, "chaincode": chaincode_id }
        });
        write
            .send(Message::Text(sub_msg.to_string()))
            .await
            .map_err(|e| subscription_error(e.to_string()))?;

        let (sender, stream) = ChaincodeEventStream::channel();
        self.session.track(stream.cancel_handle());

        let chaincode = chaincode_id.to_string();
        tokio::spawn(async move {
            run_ws_subscription(chaincode, write, read, sender).await;
        });

        Ok(stream)
    }
}

// ─── Internal WebSocket loop ──────────────────────────────────────────────────

async fn run_ws_subscription<W, R>(
    chaincode: String,
    mut write: W,
    mut read: R,
    mut sender: EventSender,
) where
    W: futures::Sink<Message> + Unpin,
    R: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            _ = sender.closed() => {
                debug!(chaincode = %chaincode, "subscription cancelled");
                let _ = write.send(Message::Close(None)).await;
                break;
            }
            msg = read.next() => msg,
        };

        match msg {
            None => {
                info!(chaincode = %chaincode, "WebSocket stream ended");
                break;
            }
            Some(Err(e)) => {
                warn!(chaincode = %chaincode, error = %e, "WebSocket error");
                break;
            }
            Some(Ok(Message::Text(text))) => {
                debug!("WS message: {}", text.chars().take(120).collect::<String>());
                if let Some(event) = parse_chaincode_event(&text) {
                    if !sender.send(event) {
                        break;
                    }
                }
            }
            Some(Ok(Message::Close(_))) => {
                info!(chaincode = %chaincode, "WebSocket closed by relay");
                break;
            }
            Some(Ok(Message::Ping(data))) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Some(Ok(_)) => {}
        }
    }
    // Dropping the sender ends the consumer's stream.
}

// ─── Message parsing ─────────────────────────────────────────────────────────

/// Parse a `chaincode_event` notification. Returns `None` for any other
/// message, or when a required field is missing or the payload is not hex.
fn parse_chaincode_event(text: &str) -> Option<ChaincodeEvent> {
    let v: Value = serde_json::from_str(text).ok()?;

    if let Some(err) = v.get("error") {
        error!("relay reported an error: {err}");
        return None;
    }
    if v.get("method")?.as_str()? != "chaincode_event" {
        return None;
    }

    let params = v.get("params")?;
    let tx_id = params.get("txId")?.as_str()?;
    let event_name = params.get("eventName")?.as_str()?;
    let payload_hex = params.get("payload").and_then(|p| p.as_str()).unwrap_or("");
    let payload = match hex::decode(payload_hex.strip_prefix("0x").unwrap_or(payload_hex)) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(tx = tx_id, error = %e, "payload is not valid hex, skipping");
            return None;
        }
    };
    let chaincode_name = params
        .get("chaincodeName")
        .and_then(|c| c.as_str())
        .unwrap_or_default();
    let block_number = params
        .get("blockNumber")
        .and_then(|b| b.as_u64())
        .unwrap_or(0);

    Some(ChaincodeEvent::new(tx_id, event_name, payload).with_origin(chaincode_name, block_number))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Identity;

    fn options(endpoint: &str) -> ConnectOptions {
        ConnectOptions::new(endpoint, Identity::new("Org1MSP", vec![]))
    }

    #[test]
    fn parse_event_notification() {
        let payload = hex::encode(br#"{"approvement":true,"approver":"alice"}"#);
        let msg = format!(
            r#"{{"method":"chaincode_event","params":{{
                "txId":"abc123","eventName":"CreateAsset",
                "chaincodeName":"basic","blockNumber":7,"payload":"{payload}"
            }}}}"#
        );
        let event = parse_chaincode_event(&msg).unwrap();
        assert_eq!(event.transaction_id, "abc123");
        assert_eq!(event.event_name, "CreateAsset");
        assert_eq!(event.chaincode_name, "basic");
        assert_eq!(event.block_number, 7);
        assert_eq!(event.payload, br#"{"approvement":true,"approver":"alice"}"#.to_vec());
    }

    #[test]
    fn skip_subscription_confirmation() {
        let msg = r#"{"id":1,"result":"subscribed"}"#;
        assert!(parse_chaincode_event(msg).is_none());
    }

    #[test]
    fn skip_bad_hex_payload() {
        let msg = r#"{"method":"chaincode_event","params":{"txId":"t","eventName":"CreateAsset","payload":"zz"}}"#;
        assert!(parse_chaincode_event(msg).is_none());
    }

    #[test]
    fn invalid_json_payload_still_parses() {
        // The relay forwards whatever bytes the chaincode set; judging them is
        // the listener's job.
        let payload = hex::encode(b"not json");
        let msg = format!(
            r#"{{"method":"chaincode_event","params":{{"txId":"t","eventName":"CreateAsset","payload":"{payload}"}}}}"#
        );
        assert_eq!(parse_chaincode_event(&msg).unwrap().payload, b"not json".to_vec());
    }

    #[test]
    fn rejects_non_websocket_endpoint() {
        assert!(matches!(
            WsGateway::connect(options("http://localhost:7051")),
            Err(GatewayError::Connection { .. })
        ));
        assert!(matches!(
            WsGateway::connect(options("not a url")),
            Err(GatewayError::Connection { .. })
        ));
        assert!(WsGateway::connect(options("ws://localhost:7051/events")).is_ok());
    }

    #[tokio::test]
    async fn unreachable_relay_fails_subscription() {
        let gateway = WsGateway::connect(options("ws://127.0.0.1:1/events")).unwrap();
        let err = gateway
            .network("mychannel")
            .chaincode_events("basic")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Subscription { .. }));
    }

    #[test]
    fn ended_subscriptions_are_pruned() {
        let gateway = WsGateway::connect(options("ws://127.0.0.1:1/events")).unwrap();
        let session = &gateway.session;

        let (_first_tx, first) = ChaincodeEventStream::channel();
        session.track(first.cancel_handle());
        let (_second_tx, second) = ChaincodeEventStream::channel();
        session.track(second.cancel_handle());
        assert_eq!(session.subscriptions.lock().unwrap().len(), 2);

        first.cancel_handle().cancel();
        let (_third_tx, third) = ChaincodeEventStream::channel();
        session.track(third.cancel_handle());
        assert_eq!(session.subscriptions.lock().unwrap().len(), 2);

        drop(gateway);
        assert!(second.cancel_handle().is_cancelled());
        assert!(third.cancel_handle().is_cancelled());
    }

    #[tokio::test]
    async fn closed_gateway_refuses_subscription() {
        let gateway = WsGateway::connect(options("ws://127.0.0.1:1/events")).unwrap();
        gateway.close().await;
        assert!(gateway.is_closed());
        assert!(matches!(
            gateway.network("mychannel").chaincode_events("basic").await,
            Err(GatewayError::Closed)
        ));
    }
}
