//! Table-driven simulation policy.
//!
//! Each operation kind maps to a failure probability, a latency range, and
//! the synthetic causes a failed operation can report. The numbers below
//! are defaults, not a contract: every entry can be overridden from
//! configuration.

use crate::core::{OperationKind, Result, SpansimError};
use std::collections::HashMap;

/// Per-kind simulation parameters.
#[derive(Debug, Clone)]
pub struct KindPolicy {
    /// Span name recorded for this kind
    pub operation_name: String,
    /// Probability in [0.0, 1.0] that an invocation fails
    pub failure_probability: f64,
    /// Inclusive latency bounds in milliseconds
    pub latency_min_ms: u64,
    /// Inclusive upper latency bound in milliseconds
    pub latency_max_ms: u64,
    /// Synthetic causes reported on failure
    pub failure_causes: Vec<String>,
}

impl KindPolicy {
    fn new(
        operation_name: &str,
        failure_probability: f64,
        latency_min_ms: u64,
        latency_max_ms: u64,
        failure_causes: &[&str],
    ) -> Self {
        Self {
            operation_name: operation_name.to_string(),
            failure_probability,
            latency_min_ms,
            latency_max_ms,
            failure_causes: failure_causes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Validates probability and latency bounds
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(SpansimError::InvalidFailureProbability(self.failure_probability));
        }
        if self.latency_min_ms > self.latency_max_ms {
            return Err(SpansimError::config(format!(
                "latency range is inverted for '{}': {}ms > {}ms",
                self.operation_name, self.latency_min_ms, self.latency_max_ms
            )));
        }
        if self.failure_probability > 0.0 && self.failure_causes.is_empty() {
            return Err(SpansimError::config(format!(
                "'{}' can fail but has no failure causes",
                self.operation_name
            )));
        }
        Ok(())
    }
}

/// Overrides for a single kind, as they appear in configuration. Unset
/// fields keep the built-in default.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PolicyOverride {
    /// Overrides the failure probability
    pub failure_probability: Option<f64>,
    /// Overrides the lower latency bound
    pub latency_min_ms: Option<u64>,
    /// Overrides the upper latency bound
    pub latency_max_ms: Option<u64>,
}

/// The full kind-to-policy mapping used by the simulator.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    entries: HashMap<OperationKind, KindPolicy>,
    /// SLO threshold checked by `slo_latency` probes
    slo_threshold_ms: u64,
}

impl PolicyTable {
    /// Builds the default table covering every kind.
    pub fn new() -> Self {
        let mut entries = HashMap::new();

        entries.insert(
            OperationKind::Service,
            KindPolicy::new("service.call", 0.0, 5, 150, &[]),
        );
        entries.insert(
            OperationKind::Distributed,
            KindPolicy::new("distributed.fan_out", 0.0, 20, 400, &[]),
        );
        entries.insert(
            OperationKind::Topology,
            KindPolicy::new("topology.walk", 0.0, 10, 250, &[]),
        );
        entries.insert(
            OperationKind::Event,
            KindPolicy::new("event.publish", 0.0, 1, 50, &[]),
        );
        entries.insert(
            OperationKind::SloSuccess,
            KindPolicy::new("slo.success_probe", 0.0, 5, 100, &[]),
        );
        entries.insert(
            OperationKind::SloFail,
            KindPolicy::new(
                "slo.fail_probe",
                0.5,
                5,
                100,
                &["induced probe failure", "dependency timeout"],
            ),
        );
        // Wide range so threshold breaches actually happen
        entries.insert(
            OperationKind::SloLatency,
            KindPolicy::new("slo.latency_probe", 0.0, 100, 2000, &[]),
        );
        entries.insert(
            OperationKind::TradeBuy,
            KindPolicy::new(
                "trade.buy",
                0.10,
                10,
                300,
                &["insufficient funds", "market closed", "price moved"],
            ),
        );
        entries.insert(
            OperationKind::TradeSell,
            KindPolicy::new(
                "trade.sell",
                0.15,
                10,
                300,
                &["position not found", "market closed", "liquidity too thin"],
            ),
        );
        entries.insert(
            OperationKind::Load,
            KindPolicy::new("load.batch", 0.0, 50, 800, &[]),
        );

        Self {
            entries,
            slo_threshold_ms: 500,
        }
    }

    /// Applies configuration overrides and disables kinds. A disabled kind
    /// is removed from the table, so simulating it fails with
    /// `UnsupportedOperationKind`.
    pub fn with_overrides(
        mut self,
        overrides: &HashMap<String, PolicyOverride>,
        disabled_kinds: &[String],
        slo_threshold_ms: u64,
    ) -> Result<Self> {
        for (name, patch) in overrides {
            let kind: OperationKind = name.parse()?;
            let entry = self
                .entries
                .get_mut(&kind)
                .ok_or_else(|| SpansimError::unsupported(name.clone()))?;
            if let Some(p) = patch.failure_probability {
                entry.failure_probability = p;
            }
            if let Some(min) = patch.latency_min_ms {
                entry.latency_min_ms = min;
            }
            if let Some(max) = patch.latency_max_ms {
                entry.latency_max_ms = max;
            }
        }

        for name in disabled_kinds {
            let kind: OperationKind = name.parse()?;
            self.entries.remove(&kind);
        }

        self.slo_threshold_ms = slo_threshold_ms;
        self.validate()?;
        Ok(self)
    }

    /// Looks up the policy for a kind. Missing entries are the only
    /// failure mode of the simulator.
    pub fn get(&self, kind: OperationKind) -> Result<&KindPolicy> {
        self.entries.get(&kind).ok_or_else(|| kind.into())
    }

    /// The SLO latency threshold in milliseconds
    pub fn slo_threshold_ms(&self) -> u64 {
        self.slo_threshold_ms
    }

    /// Kinds currently present in the table
    pub fn kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<_> = self.entries.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Validates every entry
    pub fn validate(&self) -> Result<()> {
        for policy in self.entries.values() {
            policy.validate()?;
        }
        if self.slo_threshold_ms == 0 {
            return Err(SpansimError::config("slo_threshold_ms must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new()
    }
}
