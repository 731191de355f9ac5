//! Console sink: one JSON object per line on stdout.

use crate::core::{OperationRecord, Result};
use crate::sink::RecordSink;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Prints emitted records as JSON lines, suitable for piping into jq or a
/// log shipper.
pub struct ConsoleSink;

impl ConsoleSink {
    /// Creates a console sink
    pub fn new() -> Self {
        Self
    }

    fn render(record: &OperationRecord) -> Result<String> {
        let start: DateTime<Utc> = record.start_time.into();
        let end: DateTime<Utc> = record.end_time().into();

        let line = serde_json::json!({
            "timestamp": start.to_rfc3339(),
            "end_timestamp": end.to_rfc3339(),
            "trace_id": record.trace_id.as_str(),
            "span_id": record.span_id.as_str(),
            "service": record.service_name.as_str(),
            "operation": record.operation_name,
            "kind": record.kind,
            "duration_ms": record.duration_ms(),
            "outcome": record.outcome,
            "attributes": record.attributes,
            "events": record.events,
        });

        Ok(serde_json::to_string(&line)?)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSink for ConsoleSink {
    async fn emit(&self, record: &OperationRecord) -> Result<()> {
        println!("{}", Self::render(record)?);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
