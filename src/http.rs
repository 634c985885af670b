//! HTTP transport for the relay
//!
//! Axum server exposing the five generation routes plus health and metrics.
//! Every pipeline failure is converted to a JSON error body at this boundary;
//! nothing is retried here and nothing is silently defaulted.

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::jira;
use crate::pipeline::GenerationPipeline;
use crate::prompts::{PromptInputs, TaskKind};
use crate::provider::CompletionProvider;
use crate::schemas::AssignedTask;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Shared state for the HTTP server. The pipeline (and through it the
/// completion provider) is constructed once at startup and injected here.
#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
    pub pipeline: Arc<GenerationPipeline>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

/// In-process request metrics; reset on restart
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub errors_total: u64,
    pub last_request_unix: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
    pub routes_count: HashMap<String, u64>,
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            errors_total: 0,
            last_request_unix: std::time::SystemTime::UNIX_EPOCH
                .elapsed()
                .unwrap_or_default()
                .as_secs(),
            latencies: Vec::with_capacity(256),
            routes_count: HashMap::new(),
        }
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();

    let (avg_latency_ms, p95_latency_ms) = if metrics.latencies.is_empty() {
        (None, None)
    } else {
        let sum: f64 = metrics.latencies.iter().sum();
        let avg = sum / metrics.latencies.len() as f64;
        let mut sorted = metrics.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = (sorted.len() as f64 * 0.95) as usize;
        let p95 = sorted.get(p95_idx).copied();
        (Some(avg), p95)
    };

    let mut routes: Vec<_> = metrics.routes_count.iter().collect();
    routes.sort_by(|a, b| b.1.cmp(a.1));
    let routes: Vec<_> = routes
        .into_iter()
        .map(|(k, v)| json!({ "route": k, "count": v }))
        .collect();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        json!({
            "metrics_version": "1",
            "total_requests": metrics.total_requests,
            "errors_total": metrics.errors_total,
            "last_request_unix": metrics.last_request_unix,
            "avg_latency_ms": avg_latency_ms,
            "p95_latency_ms": p95_latency_ms,
            "routes": routes
        })
        .to_string(),
    )
}

/// Extract a required non-empty text field from the request body
fn require_text(body: &Value, field: &'static str) -> Result<String> {
    body.get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or(RelayError::MissingInput {
            field: field.to_string(),
        })
}

/// Extract a required array field and serialize it back to JSON text for
/// prompt interpolation
fn require_array_text(body: &Value, field: &'static str) -> Result<String> {
    let arr = body
        .get(field)
        .and_then(|v| v.as_array())
        .ok_or(RelayError::MissingInput {
            field: field.to_string(),
        })?;
    Ok(serde_json::to_string(arr)?)
}

async fn generate_documents(
    State(state): State<HttpState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let requirements = require_text(&body, "requirements")?;
    let inputs = PromptInputs::new().with("requirements", requirements);
    let doc = state.pipeline.run(TaskKind::DocumentSet, &inputs).await?;
    Ok(Json(doc.value))
}

async fn conduct_research(
    State(state): State<HttpState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let requirements = require_text(&body, "requirements")?;
    let inputs = PromptInputs::new().with("requirements", requirements);
    let doc = state.pipeline.run(TaskKind::Research, &inputs).await?;
    Ok(Json(doc.value))
}

async fn breakdown_tasks(
    State(state): State<HttpState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let functional = require_text(&body, "functionalRequirements")?;
    let inputs = PromptInputs::new().with("functionalRequirements", functional);
    let doc = state.pipeline.run(TaskKind::TaskBreakdown, &inputs).await?;
    Ok(Json(doc.value))
}

async fn assign_tasks(
    State(state): State<HttpState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let tasks = require_array_text(&body, "tasks")?;
    let team_members = require_array_text(&body, "teamMembers")?;
    let inputs = PromptInputs::new()
        .with("tasks", tasks)
        .with("teamMembers", team_members);
    let doc = state.pipeline.run(TaskKind::TaskAssignment, &inputs).await?;
    Ok(Json(doc.value))
}

async fn create_jira_tasks(Json(body): Json<Value>) -> Result<Json<Value>> {
    let project_key = require_text(&body, "projectKey")?;
    let assigned = body
        .get("assignedTasks")
        .filter(|v| v.is_array())
        .cloned()
        .ok_or(RelayError::MissingInput {
            field: "assignedTasks".to_string(),
        })?;
    let assigned: Vec<AssignedTask> =
        serde_json::from_value(assigned).map_err(|e| RelayError::MissingInput {
            field: format!("assignedTasks: {}", e),
        })?;
    let tickets = jira::create_tickets(&assigned, &project_key);
    Ok(Json(serde_json::to_value(tickets)?))
}

/// Start the HTTP server
pub async fn start_http_server(
    config: Arc<Config>,
    provider: Arc<dyn CompletionProvider>,
) -> Result<()> {
    let state = HttpState {
        config: config.clone(),
        pipeline: Arc::new(GenerationPipeline::new(provider)),
        metrics: Arc::new(Mutex::new(HttpMetrics::new())),
    };

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/generate-documents", post(generate_documents))
        .route("/api/conduct-research", post(conduct_research))
        .route("/api/breakdown-tasks", post(breakdown_tasks))
        .route("/api/assign-tasks", post(assign_tasks))
        .route("/api/create-jira-tasks", post(create_jira_tasks))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_request,
        ))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.runtime.http_bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!(
        "Business analyst relay listening on {}",
        config.runtime.http_bind
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

/// Latency and error accounting for the /api routes
async fn track_request(
    State(metrics): State<Arc<Mutex<HttpMetrics>>>,
    req: axum::http::Request<Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let path = req.uri().path().to_string();
    let start = path
        .starts_with("/api/")
        .then(std::time::Instant::now);
    let resp = next.run(req).await;
    if let Some(start_time) = start {
        let latency_ms = start_time.elapsed().as_millis() as f64;
        let mut m = metrics.lock().await;
        m.latencies.push(latency_ms);
        if m.latencies.len() > 256 {
            m.latencies.remove(0);
        }
        if !resp.status().is_success() {
            m.errors_total = m.errors_total.saturating_add(1);
        }
        m.total_requests = m.total_requests.saturating_add(1);
        m.last_request_unix = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        *m.routes_count.entry(path).or_insert(0) += 1;
    }
    resp
}
