//! Listener metrics.
//!
//! All metrics use OpenTelemetry conventions. Without an installed meter
//! provider the global meter is a no-op.

use opentelemetry::{
    metrics::{Counter, Meter},
    KeyValue,
};

/// Counters for the event listener.
#[derive(Clone)]
pub struct ListenerMetrics {
    pub events_logged: Counter<u64>,
    pub events_dropped: Counter<u64>,
    pub write_errors: Counter<u64>,
}

impl ListenerMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            events_logged: meter
                .u64_counter("chainperm.events_logged")
                .with_description("Chaincode events appended to the contract log")
                .build(),
            events_dropped: meter
                .u64_counter("chainperm.events_dropped")
                .with_description("Chaincode events dropped because the payload could not be decoded")
                .build(),
            write_errors: meter
                .u64_counter("chainperm.write_errors")
                .with_description("Log records that could not be written")
                .build(),
        }
    }

    /// Metrics bound to the global meter provider.
    pub fn global() -> Self {
        Self::new(&opentelemetry::global::meter("chainperm"))
    }

    pub fn record_logged(&self, function: &str) {
        self.events_logged
            .add(1, &[KeyValue::new("function", function.to_string())]);
    }

    pub fn record_dropped(&self, reason: &'static str) {
        self.events_dropped.add(1, &[KeyValue::new("reason", reason)]);
    }

    pub fn record_write_error(&self) {
        self.write_errors.add(1, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_meter_accepts_records() {
        let metrics = ListenerMetrics::global();
        metrics.record_logged("CreateAsset");
        metrics.record_dropped("malformed_payload");
        metrics.record_write_error();
    }
}
