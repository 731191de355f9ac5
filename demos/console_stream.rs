//! Basic usage example for spansim.
//!
//! This example demonstrates how to:
//! 1. Build a seeded simulator
//! 2. Simulate a few operations of different kinds
//! 3. Emit the resulting records through the console sink
//!
//! Run with: cargo run --example console_stream

use spansim_lib::core::{OperationKind, OperationRequest, ServiceName};
use spansim_lib::simulator::{OperationSimulator, PolicyTable, Randomness};
use spansim_lib::sink::{ConsoleSink, RecordSink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting spansim console stream example");

    // Seeded so every run prints the same stream
    let simulator = OperationSimulator::new(
        ServiceName::new("spansim-demo".to_string())?,
        PolicyTable::new(),
        Randomness::seeded(2024),
    );
    let sink = ConsoleSink::new();

    for kind in [
        OperationKind::Service,
        OperationKind::Distributed,
        OperationKind::SloLatency,
        OperationKind::TradeBuy,
        OperationKind::TradeSell,
    ] {
        let request = OperationRequest::new(kind)
            .with_parameter("demo", true)
            .with_parameter("symbol", "ACME");
        let (result, record) = simulator.run(&request)?;

        tracing::info!(
            "{}: outcome={:?}, latency={}ms, events={}",
            kind,
            result.outcome,
            result.latency_ms,
            result.child_events.len()
        );
        sink.emit(&record).await?;
    }

    Ok(())
}
