//! OTLP/GRPC sink.
//!
//! Converts operation records into OTLP spans and exports them through
//! the generated `TraceServiceClient`. The wire encoding is entirely the
//! generated code's concern; this module only maps fields.

use crate::core::{OperationRecord, ParamValue, Result, SpansimError};
use crate::sink::RecordSink;
use async_trait::async_trait;
use opentelemetry_proto::tonic::{
    collector::trace::v1::{trace_service_client::TraceServiceClient, ExportTraceServiceRequest},
    common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue},
    resource::v1::Resource,
    trace::v1::{span, ResourceSpans, ScopeSpans, Span, Status},
};
use std::time::UNIX_EPOCH;
use tokio::sync::Mutex;
use tonic::transport::Channel;

/// Exports one OTLP span per emitted record. Connects lazily and
/// reconnects after a failed export.
pub struct OtlpSink {
    endpoint: String,
    client: Mutex<Option<TraceServiceClient<Channel>>>,
}

impl OtlpSink {
    /// Creates a sink for the given collector endpoint
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: Mutex::new(None),
        }
    }

    /// The configured collector endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn key_value(key: &str, value: &ParamValue) -> KeyValue {
    let value = match value {
        ParamValue::Str(s) => any_value::Value::StringValue(s.clone()),
        ParamValue::Int(i) => any_value::Value::IntValue(*i),
        ParamValue::Float(v) => any_value::Value::DoubleValue(*v),
        ParamValue::Bool(b) => any_value::Value::BoolValue(*b),
    };
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue { value: Some(value) }),
    }
}

fn string_key_value(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_string())),
        }),
    }
}

/// Maps a record onto the OTLP resource-spans shape.
pub fn to_resource_spans(record: &OperationRecord) -> Result<ResourceSpans> {
    let trace_id = hex::decode(record.trace_id.as_str())
        .map_err(|e| SpansimError::invalid_record(format!("trace_id is not hex: {}", e)))?;
    let span_id = hex::decode(record.span_id.as_str())
        .map_err(|e| SpansimError::invalid_record(format!("span_id is not hex: {}", e)))?;

    let start_time_nanos = record
        .start_time
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let end_time_nanos = start_time_nanos + record.duration.as_nanos() as u64;

    let status = if record.outcome.is_success() {
        Status {
            code: 1, // STATUS_CODE_OK
            message: String::new(),
        }
    } else {
        let cause = record
            .get_attribute("failure.cause")
            .and_then(ParamValue::as_str)
            .unwrap_or("simulated failure");
        Status {
            code: 2, // STATUS_CODE_ERROR
            message: cause.to_string(),
        }
    };

    let mut attributes: Vec<KeyValue> = record
        .attributes
        .iter()
        .map(|(k, v)| key_value(k, v))
        .collect();
    attributes.push(string_key_value("span.kind", "server"));

    let events = record
        .events
        .iter()
        .map(|event| span::Event {
            time_unix_nano: start_time_nanos + event.offset_ms * 1_000_000,
            name: event.name.clone(),
            attributes: event.attributes.iter().map(|(k, v)| key_value(k, v)).collect(),
            dropped_attributes_count: 0,
        })
        .collect();

    let otel_span = Span {
        trace_id,
        span_id,
        trace_state: String::new(),
        parent_span_id: vec![],
        flags: 1,
        name: record.operation_name.clone(),
        kind: span::SpanKind::Server as i32,
        start_time_unix_nano: start_time_nanos,
        end_time_unix_nano: end_time_nanos,
        attributes,
        dropped_attributes_count: 0,
        events,
        dropped_events_count: 0,
        links: vec![],
        dropped_links_count: 0,
        status: Some(status),
    };

    let resource = Resource {
        attributes: vec![
            string_key_value("service.name", record.service_name.as_str()),
            string_key_value("service.version", env!("CARGO_PKG_VERSION")),
        ],
        dropped_attributes_count: 0,
    };

    Ok(ResourceSpans {
        resource: Some(resource),
        scope_spans: vec![ScopeSpans {
            scope: Some(InstrumentationScope {
                name: "spansim".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                attributes: vec![],
                dropped_attributes_count: 0,
            }),
            spans: vec![otel_span],
            schema_url: String::new(),
        }],
        schema_url: String::new(),
    })
}

#[async_trait]
impl RecordSink for OtlpSink {
    async fn emit(&self, record: &OperationRecord) -> Result<()> {
        let resource_spans = to_resource_spans(record)?;

        let mut guard = self.client.lock().await;
        if guard.is_none() {
            tracing::debug!("Connecting OTLP exporter to {}", self.endpoint);
            *guard = Some(TraceServiceClient::connect(self.endpoint.clone()).await?);
        }

        let client = guard.as_mut().ok_or(SpansimError::ChannelSend)?;
        let request = ExportTraceServiceRequest {
            resource_spans: vec![resource_spans],
        };

        match client.export(request).await {
            Ok(_) => Ok(()),
            Err(status) => {
                // Drop the channel so the next emit reconnects
                *guard = None;
                Err(status.into())
            },
        }
    }

    fn name(&self) -> &'static str {
        "otlp"
    }

    async fn shutdown(&self) -> Result<()> {
        *self.client.lock().await = None;
        Ok(())
    }
}
