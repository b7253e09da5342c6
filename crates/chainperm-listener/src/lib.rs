//! # chainperm-listener
//!
//! Subscribes to a chaincode's event stream and appends one JSON record per
//! event to a log file.
//!
//! ## Pipeline
//! ```text
//! Network::chaincode_events (one Tokio task, delivery order)
//!       │
//!       ▼
//! format_json(payload)          ── invalid JSON  → warn, drop event
//!       │
//!       ▼
//! decode into Option<Map<..>>  ── not an object or null → warn, drop event
//!       │
//!       ▼
//! LogRecord { scname, txid, function, assetvalue }
//!       │
//!       ▼
//! RecordSink::append            ── IO / encode error → warn, continue
//! ```

pub mod format;
pub mod listener;
pub mod sink;

pub use format::{append_record, format_json};
pub use listener::{EventListener, ListenerHandle, ListenerStats};
pub use sink::{FileSink, MemorySink, RecordSink};
