//! `EventListener`: drives one chaincode event subscription on a worker task
//! and appends a log line per event.

use crate::format::format_json;
use crate::sink::{FileSink, RecordSink};
use chainperm_core::{
    config::ListenerConfig,
    error::ListenerError,
    event::{ChaincodeEvent, LogRecord},
};
use chainperm_gateway::{CancelHandle, ChaincodeEventStream, Network};
use chainperm_observability::ListenerMetrics;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// Per-listener counters.
#[derive(Debug, Default)]
pub struct ListenerStats {
    logged: AtomicU64,
    dropped: AtomicU64,
    write_errors: AtomicU64,
}

impl ListenerStats {
    /// Events appended to the sink.
    pub fn logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }

    /// Events dropped because their payload could not be decoded.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Records that could not be written.
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }
}

/// Listens for one chaincode's events and logs them.
pub struct EventListener {
    config: ListenerConfig,
    sink: Arc<dyn RecordSink>,
    stats: Arc<ListenerStats>,
    metrics: Option<ListenerMetrics>,
}

impl EventListener {
    /// A listener that appends to `config.log_path`.
    pub fn new(config: ListenerConfig) -> Self {
        let sink = Arc::new(FileSink::new(config.log_path.clone()));
        Self::with_sink(config, sink)
    }

    pub fn with_sink(config: ListenerConfig, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            config,
            sink,
            stats: Arc::new(ListenerStats::default()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ListenerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    /// Subscribe to the configured chaincode on `network` and spawn the
    /// worker task.
    ///
    /// A subscription failure is returned to the caller, which should treat
    /// it as fatal. Once started, per-event failures never stop the worker.
    pub async fn start(self, network: &dyn Network) -> Result<ListenerHandle, ListenerError> {
        info!(
            channel = network.name(),
            chaincode = %self.config.chaincode,
            contract = %self.config.contract,
            "start chaincode event listening"
        );
        let events = network.chaincode_events(&self.config.chaincode).await?;
        Ok(self.spawn(events))
    }

    /// Spawn the worker over an already-open subscription.
    pub fn spawn(self, events: ChaincodeEventStream) -> ListenerHandle {
        let cancel = events.cancel_handle();
        let stats = self.stats();
        let task = tokio::spawn(async move { self.run(events).await });
        ListenerHandle { cancel, task, stats }
    }

    async fn run(self, mut events: ChaincodeEventStream) {
        while let Some(event) = events.next().await {
            self.handle(&event).await;
        }
        info!(
            chaincode = %self.config.chaincode,
            logged = self.stats.logged(),
            dropped = self.stats.dropped(),
            write_errors = self.stats.write_errors(),
            "chaincode event listening stopped"
        );
    }

    async fn handle(&self, event: &ChaincodeEvent) {
        match self.process_event(event).await {
            Ok(record) => {
                self.stats.logged.fetch_add(1, Ordering::Relaxed);
                if let Some(m) = &self.metrics {
                    m.record_logged(&record.function);
                }
                info!(
                    tx = %record.txid,
                    function = %record.function,
                    block = event.block_number,
                    "chaincode event logged"
                );
            }
            Err(e @ (ListenerError::MalformedPayload { .. } | ListenerError::Decode { .. })) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                if let Some(m) = &self.metrics {
                    m.record_dropped(drop_reason(&e));
                }
                warn!(tx = %event.transaction_id, error = %e, "dropping chaincode event");
            }
            Err(e) => {
                self.stats.write_errors.fetch_add(1, Ordering::Relaxed);
                if let Some(m) = &self.metrics {
                    m.record_write_error();
                }
                warn!(tx = %event.transaction_id, error = %e, "failed to write log record");
            }
        }
    }

    /// Turn one event into a log record and append it to the sink.
    pub async fn process_event(&self, event: &ChaincodeEvent) -> Result<LogRecord, ListenerError> {
        let pretty =
            format_json(&event.payload).map_err(|e| ListenerError::MalformedPayload {
                tx_id: event.transaction_id.clone(),
                reason: e.to_string(),
            })?;
        debug!(
            tx = %event.transaction_id,
            event = %event.event_name,
            "chaincode event received:\n{pretty}"
        );
        if event.kind().is_none() {
            debug!(
                tx = %event.transaction_id,
                event = %event.event_name,
                "event name is not an asset-store mutation, logging anyway"
            );
        }

        // `null` is accepted and logged as-is; any other non-object is rejected.
        let assetvalue: Option<Map<String, Value>> =
            serde_json::from_str(&pretty).map_err(|e| ListenerError::Decode {
                tx_id: event.transaction_id.clone(),
                reason: e.to_string(),
            })?;

        let record = LogRecord::from_event(self.config.scname.clone(), event, assetvalue);
        self.sink.append(&record).await?;
        Ok(record)
    }
}

fn drop_reason(e: &ListenerError) -> &'static str {
    match e {
        ListenerError::MalformedPayload { .. } => "malformed_payload",
        _ => "decode_failure",
    }
}

/// Control over a running listener.
pub struct ListenerHandle {
    cancel: CancelHandle,
    task: JoinHandle<()>,
    stats: Arc<ListenerStats>,
}

impl ListenerHandle {
    /// Stop at the next event wait. Events already being written finish.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the worker task to end.
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}
