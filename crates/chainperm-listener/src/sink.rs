//! Destinations for log records.

use crate::format::append_record;
use async_trait::async_trait;
use chainperm_core::{error::ListenerError, event::LogRecord};
use std::path::PathBuf;
use std::sync::Mutex;

/// Where the listener writes each record.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, record: &LogRecord) -> Result<(), ListenerError>;
}

/// Append-only JSON-lines file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSink for FileSink {
    async fn append(&self, record: &LogRecord) -> Result<(), ListenerError> {
        append_record(&self.path, record).await
    }
}

/// Keeps records in memory. All data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append(&self, record: &LogRecord) -> Result<(), ListenerError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
