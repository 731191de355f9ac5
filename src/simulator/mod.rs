//! Observable-operation simulator.
//!
//! Models a unit of work as a span-equivalent record with synthetic
//! latency, success/failure outcome, structured attributes, and ordered
//! child events. Each call is stateless and independent; latency is a
//! recorded value, never an actual sleep, so callers may invoke the
//! simulator concurrently without coordination.

use crate::core::{
    ChildEvent, OperationKind, OperationRecord, OperationRequest, OperationResult, Outcome,
    ParamValue, Result, ServiceName, SpanId, TraceId,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

pub mod policy;

pub use policy::{KindPolicy, PolicyOverride, PolicyTable};

/// Synthetic downstream services referenced by distributed and topology
/// operations.
const PEER_SERVICES: [&str; 5] = [
    "auth-service",
    "user-service",
    "order-service",
    "payment-service",
    "inventory-service",
];

/// Source of randomness for latency draws and outcome rolls.
///
/// `Entropy` is the production mode. `Seeded` derives an independent RNG
/// per call from an atomic counter, so concurrent calls need no locking
/// and a fixed seed replays the same sequence.
#[derive(Debug)]
pub enum Randomness {
    /// Fresh OS entropy per call
    Entropy,
    /// Deterministic per-call seeds derived from a base seed
    Seeded { base: u64, counter: AtomicU64 },
}

impl Randomness {
    /// Creates a deterministic source from a base seed
    pub fn seeded(base: u64) -> Self {
        Randomness::Seeded {
            base,
            counter: AtomicU64::new(0),
        }
    }

    /// Produces the RNG for one simulate call
    fn rng(&self) -> StdRng {
        match self {
            Randomness::Entropy => StdRng::from_entropy(),
            Randomness::Seeded { base, counter } => {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                // SplitMix-style spread so consecutive counters do not
                // produce correlated streams
                StdRng::seed_from_u64(base ^ n.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            },
        }
    }
}

impl Default for Randomness {
    fn default() -> Self {
        Randomness::Entropy
    }
}

/// The simulator: policy table in, operation results out.
pub struct OperationSimulator {
    service_name: ServiceName,
    policy: PolicyTable,
    randomness: Randomness,
}

impl OperationSimulator {
    /// Creates a simulator with the given policy and randomness source
    pub fn new(service_name: ServiceName, policy: PolicyTable, randomness: Randomness) -> Self {
        Self {
            service_name,
            policy,
            randomness,
        }
    }

    /// The service name stamped on emitted records
    pub fn service_name(&self) -> &ServiceName {
        &self.service_name
    }

    /// The active policy table
    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Simulates one operation.
    ///
    /// The only failure mode is a kind missing from the policy table;
    /// randomized Failure outcomes are data, carried in the result.
    pub fn simulate(&self, request: &OperationRequest) -> Result<OperationResult> {
        let policy = self.policy.get(request.kind)?;
        let mut rng = self.randomness.rng();

        let latency_ms = rng.gen_range(policy.latency_min_ms..=policy.latency_max_ms);
        let failed = policy.failure_probability > 0.0
            && rng.gen::<f64>() < policy.failure_probability;

        let mut result = OperationResult {
            outcome: if failed { Outcome::Failure } else { Outcome::Success },
            latency_ms,
            attributes: request.parameters.clone(),
            child_events: Vec::new(),
        };
        result
            .attributes
            .insert("operation.kind".to_string(), request.kind.as_str().into());

        if failed {
            let cause = policy.failure_causes[rng.gen_range(0..policy.failure_causes.len())].clone();
            result.attributes.insert("failure.cause".to_string(), cause.into());
        }

        self.add_child_events(request, &mut result, &mut rng);
        result.child_events.sort_by_key(|e| e.offset_ms);

        Ok(result)
    }

    /// Builds the span-equivalent record for a simulated operation.
    ///
    /// Start time is back-dated by the simulated latency so the record
    /// reads like a span that just finished.
    pub fn build_record(
        &self,
        request: &OperationRequest,
        result: &OperationResult,
    ) -> Result<OperationRecord> {
        let policy = self.policy.get(request.kind)?;
        let mut rng = self.randomness.rng();

        let trace_id = TraceId::new(hex::encode(rng.gen::<[u8; 16]>()))?;
        let span_id = SpanId::new(hex::encode(rng.gen::<[u8; 8]>()))?;
        let duration = Duration::from_millis(result.latency_ms);

        OperationRecord::builder()
            .trace_id(trace_id)
            .span_id(span_id)
            .service_name(self.service_name.clone())
            .operation_name(policy.operation_name.clone())
            .kind(request.kind)
            .start_time(SystemTime::now() - duration)
            .duration(duration)
            .outcome(result.outcome)
            .attributes(result.attributes.clone())
            .events(result.child_events.clone())
            .build()
    }

    /// Simulates an operation and builds its record in one step
    pub fn run(&self, request: &OperationRequest) -> Result<(OperationResult, OperationRecord)> {
        let result = self.simulate(request)?;
        let record = self.build_record(request, &result)?;
        Ok((result, record))
    }

    fn add_child_events(
        &self,
        request: &OperationRequest,
        result: &mut OperationResult,
        rng: &mut StdRng,
    ) {
        let latency = result.latency_ms;
        match request.kind {
            OperationKind::Distributed | OperationKind::Topology => {
                let hops = rng.gen_range(1..=3usize);
                for hop in 0..hops {
                    let peer = PEER_SERVICES[rng.gen_range(0..PEER_SERVICES.len())];
                    // Spread hops across the operation's duration
                    let offset = latency * (hop as u64 + 1) / (hops as u64 + 1);
                    result.child_events.push(
                        ChildEvent::new("downstream_call", offset)
                            .with_attribute("peer.service", peer)
                            .with_attribute("hop", hop as i64),
                    );
                }
            },
            OperationKind::SloLatency => {
                let threshold = self.policy.slo_threshold_ms();
                result.child_events.push(
                    ChildEvent::new("threshold_check", latency)
                        .with_attribute("threshold_ms", threshold)
                        .with_attribute("breached", latency > threshold),
                );
            },
            OperationKind::TradeBuy | OperationKind::TradeSell => {
                let symbol = request
                    .parameter("symbol")
                    .and_then(ParamValue::as_str)
                    .unwrap_or("ACME")
                    .to_string();
                let quantity = request
                    .parameter("quantity")
                    .and_then(ParamValue::as_int)
                    .unwrap_or_else(|| rng.gen_range(1..=500));
                let price = (rng.gen_range(10.0..500.0f64) * 100.0).round() / 100.0;
                let side = if request.kind == OperationKind::TradeBuy { "buy" } else { "sell" };

                result.child_events.push(
                    ChildEvent::new("order_submitted", latency.min(5))
                        .with_attribute("symbol", symbol.clone())
                        .with_attribute("quantity", quantity)
                        .with_attribute("price", price)
                        .with_attribute("side", side),
                );

                if result.outcome.is_failure() {
                    let cause = result
                        .attribute("failure.cause")
                        .and_then(ParamValue::as_str)
                        .unwrap_or("rejected")
                        .to_string();
                    result.child_events.push(
                        ChildEvent::new("order_rejected", latency)
                            .with_attribute("symbol", symbol)
                            .with_attribute("reason", cause),
                    );
                }
            },
            OperationKind::Load => {
                let batch_size = rng.gen_range(10..=100i64);
                result.child_events.push(
                    ChildEvent::new("batch", latency / 2).with_attribute("batch_size", batch_size),
                );
            },
            OperationKind::Event => {
                let name = request
                    .parameter("event.name")
                    .and_then(ParamValue::as_str)
                    .unwrap_or("demo_event")
                    .to_string();
                result
                    .child_events
                    .push(ChildEvent::new(name, latency.min(1)));
            },
            OperationKind::Service | OperationKind::SloSuccess | OperationKind::SloFail => {},
        }
    }
}
