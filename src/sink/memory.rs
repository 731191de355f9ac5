//! In-memory sink for tests and introspection.

use crate::core::{OperationRecord, Result};
use crate::sink::RecordSink;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Buffers emitted records in memory. Used by the test suites and handy
/// for embedding the simulator without a transport.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<Vec<OperationRecord>>,
}

impl MemorySink {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records emitted so far
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True when nothing has been emitted
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of everything emitted so far
    pub async fn records(&self) -> Vec<OperationRecord> {
        self.records.read().await.clone()
    }

    /// Drops all buffered records
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn emit(&self, record: &OperationRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OperationKind, Outcome, ServiceName, SpanId, TraceId};

    #[tokio::test]
    async fn test_emit_buffers_records() {
        let sink = MemorySink::new();
        assert!(sink.is_empty().await);

        let record = OperationRecord::builder()
            .trace_id(TraceId::new("t1".to_string()).unwrap())
            .span_id(SpanId::new("s1".to_string()).unwrap())
            .service_name(ServiceName::new("spansim".to_string()).unwrap())
            .operation_name("service.call")
            .kind(OperationKind::Service)
            .outcome(Outcome::Success)
            .build()
            .unwrap();

        sink.emit(&record).await.unwrap();
        sink.emit(&record).await.unwrap();

        assert_eq!(sink.len().await, 2);
        assert_eq!(sink.records().await[0].operation_name, "service.call");

        sink.clear().await;
        assert!(sink.is_empty().await);
    }
}
