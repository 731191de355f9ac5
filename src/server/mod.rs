//! HTTP dispatcher.
//!
//! One endpoint per operation kind: inbound requests become
//! `OperationRequest`s, results map to HTTP responses (Success → 200,
//! Failure → 500, unsupported kind → 400) and every simulated operation
//! emits one record to the configured sink.

use crate::core::{
    ChildEvent, OperationKind, OperationRequest, Outcome, ParamValue, Result, SpansimError,
};
use crate::simulator::OperationSimulator;
use crate::sink::RecordSink;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Dispatcher state shared across handlers.
#[derive(Clone)]
pub struct DispatcherState {
    /// The simulator every endpoint drives
    pub simulator: Arc<OperationSimulator>,
    /// Destination for emitted records
    pub sink: Arc<dyn RecordSink>,
}

/// Response body for a simulated operation.
#[derive(Debug, Serialize)]
struct OperationResponse {
    trace_id: String,
    span_id: String,
    operation: String,
    kind: OperationKind,
    outcome: Outcome,
    latency_ms: u64,
    attributes: HashMap<String, ParamValue>,
    child_events: Vec<ChildEvent>,
}

/// Create the dispatcher router.
pub fn create_router(state: DispatcherState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/operations/:kind", get(handle_operation).post(handle_operation))
        .route("/trade/:side", get(handle_trade).post(handle_trade))
        .route("/slo/:probe", get(handle_slo).post(handle_slo))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Start the dispatcher on the configured address.
pub async fn start_server(state: DispatcherState, addr: SocketAddr) -> Result<()> {
    let app = create_router(state);

    tracing::info!("Starting dispatcher on http://{}", addr);
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .await
        .map_err(|e| SpansimError::network(format!("dispatcher server error: {}", e)))?;

    Ok(())
}

async fn handle_operation(
    State(state): State<DispatcherState>,
    Path(kind): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<HashMap<String, ParamValue>>>,
) -> std::result::Result<Response, HttpError> {
    let kind: OperationKind = kind
        .parse()
        .map_err(|e: SpansimError| HttpError::BadRequest(e.to_string()))?;
    dispatch(&state, kind, query, body.map(|Json(b)| b)).await
}

async fn handle_trade(
    State(state): State<DispatcherState>,
    Path(side): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<HashMap<String, ParamValue>>>,
) -> std::result::Result<Response, HttpError> {
    let kind = match side.as_str() {
        "buy" => OperationKind::TradeBuy,
        "sell" => OperationKind::TradeSell,
        other => {
            return Err(HttpError::BadRequest(format!("unknown trade side: {}", other)));
        },
    };
    dispatch(&state, kind, query, body.map(|Json(b)| b)).await
}

async fn handle_slo(
    State(state): State<DispatcherState>,
    Path(probe): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<HashMap<String, ParamValue>>>,
) -> std::result::Result<Response, HttpError> {
    let kind = match probe.as_str() {
        "success" => OperationKind::SloSuccess,
        "fail" => OperationKind::SloFail,
        "latency" => OperationKind::SloLatency,
        other => {
            return Err(HttpError::BadRequest(format!("unknown slo probe: {}", other)));
        },
    };
    dispatch(&state, kind, query, body.map(|Json(b)| b)).await
}

/// Shared simulate-then-emit path for every endpoint.
async fn dispatch(
    state: &DispatcherState,
    kind: OperationKind,
    query: HashMap<String, String>,
    body: Option<HashMap<String, ParamValue>>,
) -> std::result::Result<Response, HttpError> {
    let mut request = OperationRequest::new(kind);
    for (key, value) in query {
        request.parameters.insert(key, coerce_param(value));
    }
    if let Some(body) = body {
        request.parameters.extend(body);
    }

    let (result, record) = state.simulator.run(&request).map_err(|e| {
        if e.is_client_error() {
            HttpError::BadRequest(e.to_string())
        } else {
            HttpError::Internal(e.to_string())
        }
    })?;

    if let Err(e) = state.sink.emit(&record).await {
        tracing::error!("Failed to emit record to {} sink: {}", state.sink.name(), e);
        return Err(HttpError::Internal(format!("emission failed: {}", e)));
    }

    let status = if result.outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let response = OperationResponse {
        trace_id: record.trace_id.as_str().to_string(),
        span_id: record.span_id.as_str().to_string(),
        operation: record.operation_name.clone(),
        kind,
        outcome: result.outcome,
        latency_ms: result.latency_ms,
        attributes: result.attributes,
        child_events: result.child_events,
    };

    Ok((status, Json(response)).into_response())
}

/// Query strings arrive as text; recover the primitive the caller meant.
fn coerce_param(value: String) -> ParamValue {
    if let Ok(b) = value.parse::<bool>() {
        return ParamValue::Bool(b);
    }
    if let Ok(i) = value.parse::<i64>() {
        return ParamValue::Int(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return ParamValue::Float(f);
    }
    ParamValue::Str(value)
}

/// Health check endpoint.
async fn health_handler(State(state): State<DispatcherState>) -> impl IntoResponse {
    let kinds: Vec<&'static str> = state
        .simulator
        .policy()
        .kinds()
        .into_iter()
        .map(|k| k.as_str())
        .collect();

    Json(serde_json::json!({
        "status": "ok",
        "service": state.simulator.service_name().as_str(),
        "sink": state.sink.name(),
        "kinds": kinds,
    }))
}

/// Root handler.
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "spansim dispatcher",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/operations/{kind}": "GET/POST - simulate one operation",
            "/trade/{buy|sell}": "GET/POST - synthetic orders",
            "/slo/{success|fail|latency}": "GET/POST - SLO probes",
            "/health": "GET - health check"
        }
    }))
}

/// HTTP-specific error type.
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            HttpError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}
