use crate::core::error::{Result, SpansimError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// The kinds of simulated work a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Plain single-service request handling
    Service,
    /// Fan-out call across synthetic downstream services
    Distributed,
    /// Walk of a synthetic service topology
    Topology,
    /// Emission of a single custom event
    Event,
    /// SLO probe that always passes
    SloSuccess,
    /// SLO probe with an induced failure probability
    SloFail,
    /// SLO probe with a wide latency range to exercise threshold breaches
    SloLatency,
    /// Synthetic buy order
    TradeBuy,
    /// Synthetic sell order
    TradeSell,
    /// Batch of work representing generated load
    Load,
}

impl OperationKind {
    /// All kinds, in declaration order. Used for default policies and
    /// the load generator's kind pool.
    pub const ALL: [OperationKind; 10] = [
        OperationKind::Service,
        OperationKind::Distributed,
        OperationKind::Topology,
        OperationKind::Event,
        OperationKind::SloSuccess,
        OperationKind::SloFail,
        OperationKind::SloLatency,
        OperationKind::TradeBuy,
        OperationKind::TradeSell,
        OperationKind::Load,
    ];

    /// Returns the snake_case name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Service => "service",
            OperationKind::Distributed => "distributed",
            OperationKind::Topology => "topology",
            OperationKind::Event => "event",
            OperationKind::SloSuccess => "slo_success",
            OperationKind::SloFail => "slo_fail",
            OperationKind::SloLatency => "slo_latency",
            OperationKind::TradeBuy => "trade_buy",
            OperationKind::TradeSell => "trade_sell",
            OperationKind::Load => "load",
        }
    }
}

impl FromStr for OperationKind {
    type Err = SpansimError;

    /// Parses a kind name. Hyphens are accepted as separators so route
    /// segments like `trade-buy` resolve too.
    fn from_str(s: &str) -> Result<Self> {
        match s.replace('-', "_").as_str() {
            "service" => Ok(OperationKind::Service),
            "distributed" => Ok(OperationKind::Distributed),
            "topology" => Ok(OperationKind::Topology),
            "event" => Ok(OperationKind::Event),
            "slo_success" => Ok(OperationKind::SloSuccess),
            "slo_fail" => Ok(OperationKind::SloFail),
            "slo_latency" => Ok(OperationKind::SloLatency),
            "trade_buy" => Ok(OperationKind::TradeBuy),
            "trade_sell" => Ok(OperationKind::TradeSell),
            "load" => Ok(OperationKind::Load),
            _ => Err(SpansimError::unsupported(s)),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A primitive attribute value: string, integer, float, or bool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    Str(String),
}

impl ParamValue {
    /// Returns the string payload if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean payload if this is a bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer payload if this is an int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<u64> for ParamValue {
    fn from(i: u64) -> Self {
        ParamValue::Int(i as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

/// One request for simulated work. Immutable, created per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRequest {
    /// What kind of work to simulate
    pub kind: OperationKind,
    /// Caller-supplied parameters, passed through to result attributes
    #[serde(default)]
    pub parameters: HashMap<String, ParamValue>,
}

impl OperationRequest {
    /// Creates a request with no parameters
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            parameters: HashMap::new(),
        }
    }

    /// Adds a parameter, consuming and returning the request
    pub fn with_parameter<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Gets a parameter value by key
    pub fn parameter(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }
}

/// Outcome of a simulated operation. Failure is data, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The operation completed
    Success,
    /// The operation failed for a synthetic cause
    Failure,
}

impl Outcome {
    /// Returns true for Success
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Returns true for Failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure)
    }
}

/// A timestamped sub-step of a simulated operation, ordered by offset
/// from the operation's start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildEvent {
    /// Event name
    pub name: String,
    /// Milliseconds after operation start
    pub offset_ms: u64,
    /// Event attributes
    #[serde(default)]
    pub attributes: HashMap<String, ParamValue>,
}

impl ChildEvent {
    /// Creates an event at the given offset
    pub fn new<S: Into<String>>(name: S, offset_ms: u64) -> Self {
        Self {
            name: name.into(),
            offset_ms,
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute, consuming and returning the event
    pub fn with_attribute<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// The product of one simulated operation. Produced once, consumed by the
/// emitting step, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// Success or synthetic failure
    pub outcome: Outcome,
    /// Simulated latency. Recorded value, not wall-clock time spent.
    pub latency_ms: u64,
    /// Structured attributes describing the operation
    pub attributes: HashMap<String, ParamValue>,
    /// Ordered sub-steps
    pub child_events: Vec<ChildEvent>,
}

impl OperationResult {
    /// Gets an attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&ParamValue> {
        self.attributes.get(key)
    }

    /// Finds the first child event with the given name
    pub fn event(&self, name: &str) -> Option<&ChildEvent> {
        self.child_events.iter().find(|e| e.name == name)
    }
}

/// Unique identifier for a trace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

/// Unique identifier for a span within a trace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(String);

/// Service name identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceName(String);

impl TraceId {
    /// Creates a new TraceId after validation
    pub fn new(id: String) -> Result<Self> {
        if id.is_empty() {
            return Err(SpansimError::invalid_record("TraceId cannot be empty"));
        }
        // OTEL trace IDs are 16 bytes = 32 hex characters
        if id.len() > 32 {
            return Err(SpansimError::invalid_record(format!(
                "TraceId cannot exceed 32 characters, got {}",
                id.len()
            )));
        }
        Ok(TraceId(id))
    }

    /// Returns the string representation of the trace ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl SpanId {
    /// Creates a new SpanId after validation
    pub fn new(id: String) -> Result<Self> {
        if id.is_empty() {
            return Err(SpansimError::invalid_record("SpanId cannot be empty"));
        }
        // OTEL span IDs are 8 bytes = 16 hex characters
        if id.len() > 16 {
            return Err(SpansimError::invalid_record(format!(
                "SpanId cannot exceed 16 characters, got {}",
                id.len()
            )));
        }
        Ok(SpanId(id))
    }

    /// Returns the string representation of the span ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ServiceName {
    /// Creates a new ServiceName after validation
    pub fn new(name: String) -> Result<Self> {
        if name.is_empty() {
            return Err(SpansimError::invalid_record("ServiceName cannot be empty"));
        }
        if name.len() > 255 {
            return Err(SpansimError::invalid_record("ServiceName cannot exceed 255 characters"));
        }
        Ok(ServiceName(name))
    }

    /// Returns the string representation of the service name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The span-equivalent telemetry record emitted for one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Trace this record belongs to
    pub trace_id: TraceId,
    /// This record's span ID
    pub span_id: SpanId,
    /// Service that performed the operation
    pub service_name: ServiceName,
    /// Operation name from the policy table
    pub operation_name: String,
    /// Kind that was simulated
    pub kind: OperationKind,
    /// When the operation started
    pub start_time: SystemTime,
    /// Simulated duration
    pub duration: Duration,
    /// Success or synthetic failure
    pub outcome: Outcome,
    /// Record attributes
    pub attributes: HashMap<String, ParamValue>,
    /// Child events, offsets relative to start_time
    pub events: Vec<ChildEvent>,
}

impl OperationRecord {
    /// Creates a new record builder
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Returns the end time of the operation
    pub fn end_time(&self) -> SystemTime {
        self.start_time + self.duration
    }

    /// Returns the duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// Gets an attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&ParamValue> {
        self.attributes.get(key)
    }
}

/// Builder for creating OperationRecord instances
#[derive(Default)]
pub struct RecordBuilder {
    trace_id: Option<TraceId>,
    span_id: Option<SpanId>,
    service_name: Option<ServiceName>,
    operation_name: Option<String>,
    kind: Option<OperationKind>,
    start_time: Option<SystemTime>,
    duration: Option<Duration>,
    outcome: Option<Outcome>,
    attributes: HashMap<String, ParamValue>,
    events: Vec<ChildEvent>,
}

impl RecordBuilder {
    pub fn trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn span_id(mut self, span_id: SpanId) -> Self {
        self.span_id = Some(span_id);
        self
    }

    pub fn service_name(mut self, service_name: ServiceName) -> Self {
        self.service_name = Some(service_name);
        self
    }

    pub fn operation_name<S: Into<String>>(mut self, operation_name: S) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn kind(mut self, kind: OperationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn start_time(mut self, start_time: SystemTime) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn attribute<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes(mut self, attributes: HashMap<String, ParamValue>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn event(mut self, event: ChildEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn events(mut self, events: Vec<ChildEvent>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn build(self) -> Result<OperationRecord> {
        Ok(OperationRecord {
            trace_id: self
                .trace_id
                .ok_or_else(|| SpansimError::invalid_record("trace_id is required"))?,
            span_id: self
                .span_id
                .ok_or_else(|| SpansimError::invalid_record("span_id is required"))?,
            service_name: self
                .service_name
                .ok_or_else(|| SpansimError::invalid_record("service_name is required"))?,
            operation_name: self
                .operation_name
                .ok_or_else(|| SpansimError::invalid_record("operation_name is required"))?,
            kind: self
                .kind
                .ok_or_else(|| SpansimError::invalid_record("kind is required"))?,
            start_time: self.start_time.unwrap_or_else(SystemTime::now),
            duration: self.duration.unwrap_or(Duration::from_millis(0)),
            outcome: self.outcome.unwrap_or(Outcome::Success),
            attributes: self.attributes,
            events: self.events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(kind.as_str().parse::<OperationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_accepts_hyphens() {
        assert_eq!("trade-buy".parse::<OperationKind>().unwrap(), OperationKind::TradeBuy);
        assert_eq!("slo-latency".parse::<OperationKind>().unwrap(), OperationKind::SloLatency);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = "quantum_flux".parse::<OperationKind>().unwrap_err();
        assert!(matches!(err, SpansimError::UnsupportedOperationKind(ref k) if k == "quantum_flux"));
    }

    #[test]
    fn test_trace_id_validation() {
        assert!(TraceId::new("4bf92f3577b34da6a3ce929d0e0e4736".to_string()).is_ok());
        assert!(TraceId::new(String::new()).is_err());
        assert!(TraceId::new("a".repeat(33)).is_err());
    }

    #[test]
    fn test_span_id_validation() {
        assert!(SpanId::new("00f067aa0ba902b7".to_string()).is_ok());
        assert!(SpanId::new(String::new()).is_err());
        assert!(SpanId::new("a".repeat(17)).is_err());
    }

    #[test]
    fn test_record_builder() {
        let record = OperationRecord::builder()
            .trace_id(TraceId::new("trace1".to_string()).unwrap())
            .span_id(SpanId::new("span1".to_string()).unwrap())
            .service_name(ServiceName::new("spansim".to_string()).unwrap())
            .operation_name("trade.buy")
            .kind(OperationKind::TradeBuy)
            .duration(Duration::from_millis(42))
            .outcome(Outcome::Success)
            .attribute("symbol", "ACME")
            .event(ChildEvent::new("order_submitted", 5))
            .build()
            .unwrap();

        assert_eq!(record.duration_ms(), 42);
        assert_eq!(record.get_attribute("symbol"), Some(&ParamValue::Str("ACME".to_string())));
        assert_eq!(record.events.len(), 1);
        assert_eq!(record.end_time(), record.start_time + Duration::from_millis(42));
    }

    #[test]
    fn test_record_builder_requires_ids() {
        let result = OperationRecord::builder().operation_name("x").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_request_parameters() {
        let request = OperationRequest::new(OperationKind::TradeBuy)
            .with_parameter("symbol", "ACME")
            .with_parameter("quantity", 50i64);

        assert_eq!(request.parameter("symbol").and_then(ParamValue::as_str), Some("ACME"));
        assert_eq!(request.parameter("quantity").and_then(ParamValue::as_int), Some(50));
        assert!(request.parameter("missing").is_none());
    }

    #[test]
    fn test_param_value_serde_is_untagged() {
        let json = serde_json::to_string(&ParamValue::Int(7)).unwrap();
        assert_eq!(json, "7");
        let json = serde_json::to_string(&ParamValue::Bool(true)).unwrap();
        assert_eq!(json, "true");
    }
}
