//! # chainperm-observability
//!
//! Logging and metrics for the ChainPerm client.
//!
//! ## Built-in metrics
//! - `chainperm.events_logged`: counter, tagged with function
//! - `chainperm.events_dropped`: counter, tagged with reason
//! - `chainperm.write_errors`: counter
//!
//! ## Structured logging
//! Human-readable or JSON logs, with levels configurable per component.

pub mod metrics;
pub mod tracing_setup;

pub use chainperm_core::config::LogConfig;
pub use metrics::ListenerMetrics;
pub use tracing_setup::{build_filter, init_tracing};
