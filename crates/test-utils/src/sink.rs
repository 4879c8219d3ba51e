use std::sync::{Arc, Mutex};

use dagflow::engine::{ProgressRecord, ResultSink, SinkFuture};

/// Sink that keeps every record in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    records: Arc<Mutex<Vec<ProgressRecord>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProgressRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Per-task records, in emission order.
    pub fn task_records(&self) -> Vec<ProgressRecord> {
        self.records()
            .into_iter()
            .filter(|r| !r.is_summary())
            .collect()
    }

    pub fn summary(&self) -> Option<ProgressRecord> {
        self.records().into_iter().find(|r| r.is_summary())
    }
}

impl ResultSink for CollectingSink {
    fn emit(&self, record: ProgressRecord) -> SinkFuture<'_> {
        self.records.lock().unwrap().push(record);
        Box::pin(async { Ok(()) })
    }
}
