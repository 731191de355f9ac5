//! Telemetry sinks.
//!
//! The simulator's output goes through the narrow `RecordSink` interface:
//! one emitted record per simulated operation. Sinks own their transport
//! state; the simulator never sees an exporter.

use crate::core::{Config, OperationRecord, Result, SinkKind};
use async_trait::async_trait;
use std::sync::Arc;

pub mod console;
pub mod memory;
pub mod otlp;

pub use console::ConsoleSink;
pub use memory::MemorySink;
pub use otlp::OtlpSink;

/// Destination for emitted operation records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Emits one record. Errors are the sink's transport failures, never
    /// simulated outcomes.
    async fn emit(&self, record: &OperationRecord) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &'static str;

    /// Flushes and releases transport resources. Called once at process
    /// shutdown by whoever constructed the sink.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Constructs the sink selected by configuration.
pub fn build_sink(config: &Config) -> Arc<dyn RecordSink> {
    match config.sink.kind {
        SinkKind::Console => Arc::new(ConsoleSink::new()),
        SinkKind::Otlp => Arc::new(OtlpSink::new(config.sink.endpoint.clone())),
    }
}
