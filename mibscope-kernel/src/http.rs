/**
 * MIBSCOPE HTTP API - REST front of the kernel
 *
 * ROLE:
 * Serves the dashboard: agent inventory, one-shot SNMP get/set, service
 * control, traps, the services table and the per-client dashboard sessions.
 *
 * HOW IT WORKS:
 * - Axum router with an API key middleware and a trace layer
 * - Stateless routes (/metric, /control, /traps) go straight to the registry
 * - /sessions routes delegate to the SessionManager, which owns the MIB
 *   trees and their refresh tasks
 * - Every failure, including malformed JSON bodies and query strings, is
 *   answered as `{"status": "error", "message": ...}` with the matching
 *   HTTP status
 *
 * SECURITY:
 * - When an API key is configured, `x-api-key` is required on every route
 *   except /health
 * - Rejected requests are logged with their path, never with the key sent
 * - With no key configured the API is open, for local demos only
 */

use crate::agents::ControlError;
use crate::models::{
    AgentSelection, AgentView, ChartPoint, ControlAction, ControlReply, ControlRequest,
    DashboardMetrics, FetchReply, MetricQuery, MetricReply, MibSearch, ServiceEntry, SessionView,
    SetReply, SetRequest, Severity, TrapView,
};
use crate::services::service_table;
use crate::sessions::SessionError;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mibscope_agent_sim::EnterpriseObject;
use mibscope_core::{AgentAddress, ApplyOutcome, GatewayError, MetricGateway, MibNode, Oid};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Missing or invalid API key")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "status": "error", "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound { oid, .. } => ApiError::NotFound(format!("OID {oid} not found")),
            GatewayError::ReadOnly { oid } => ApiError::Forbidden(format!("OID {oid} is read-only")),
            GatewayError::InvalidValue { oid, value } => {
                ApiError::BadRequest(format!("Invalid value '{value}' for OID {oid}"))
            }
            GatewayError::Unreachable { agent, reason } => {
                ApiError::Internal(format!("Agent {agent} unreachable: {reason}"))
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn require_api_key(
    State(app): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = app.cfg.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };
    if req.uri().path().starts_with("/health") {
        return Ok(next.run(req).await);
    }

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !ok {
        warn!(path = %req.uri().path(), "rejected request without a valid API key");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/agents", get(list_agents))
        .route("/metric", get(get_metric).post(set_metric))
        .route("/control", post(control_service))
        .route("/traps", get(list_traps))
        .route("/services", get(list_services))
        .route("/sessions", post(open_session))
        .route("/sessions/{id}", axum::routing::delete(close_session))
        .route("/sessions/{id}/mib", get(session_tree))
        .route("/sessions/{id}/mib/{oid}/toggle", post(toggle_node))
        .route("/sessions/{id}/mib/{oid}/fetch", post(fetch_node))
        .route("/sessions/{id}/agent", axum::routing::put(switch_agent))
        .route("/sessions/{id}/metrics", get(session_metrics))
        .route("/sessions/{id}/charts", get(session_charts))
        .layer(middleware::from_fn_with_state(app.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

fn parse_oid(raw: &str) -> Result<Oid, ApiError> {
    Oid::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn parse_session(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid session id '{raw}'")))
}

async fn known_agent(app: &AppState, raw: Option<String>) -> Result<AgentAddress, ApiError> {
    let agent = raw
        .filter(|a| !a.is_empty())
        .map(AgentAddress::new)
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter: agent".into()))?;
    if !app.registry.contains(&agent).await {
        return Err(ApiError::NotFound(format!("Unknown agent {agent}")));
    }
    Ok(agent)
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<crate::health::KernelHealth> {
    let agents = app.registry.len().await;
    Json(app.health.get_health(agents, app.sessions.len()))
}

// GET /agents
async fn list_agents(State(app): State<AppState>) -> Json<Vec<AgentView>> {
    Json(app.registry.list_agents().await)
}

// GET /metric?agent=&oid=
async fn get_metric(
    State(app): State<AppState>,
    query: Result<Query<MetricQuery>, QueryRejection>,
) -> ApiResult<MetricReply> {
    let Query(query) = query?;
    let (Some(agent), Some(oid)) = (query.agent, query.oid) else {
        return Err(ApiError::BadRequest(
            "Missing required parameters: agent and oid".into(),
        ));
    };
    let oid = parse_oid(&oid)?;
    let agent = AgentAddress::new(agent);

    let value = app.registry.fetch(&agent, &oid).await?;
    Ok(Json(MetricReply {
        oid: oid.to_text(),
        kind: value.type_name().into(),
        value,
        agent,
    }))
}

// POST /metric
async fn set_metric(
    State(app): State<AppState>,
    payload: Result<Json<SetRequest>, JsonRejection>,
) -> ApiResult<SetReply> {
    let Json(req) = payload?;
    let (Some(agent), Some(oid), Some(value)) = (req.agent, req.oid, req.value) else {
        return Err(ApiError::BadRequest(
            "Missing required parameters: agent, oid, and value".into(),
        ));
    };
    let oid = parse_oid(&oid)?;
    let agent = AgentAddress::new(agent);

    app.registry.set(&agent, &oid, value.clone()).await?;
    Ok(Json(SetReply {
        status: "success".into(),
        message: format!("Successfully set OID {oid} to {value} on agent {agent}"),
        oid: oid.to_text(),
        value,
        agent,
    }))
}

// POST /control
async fn control_service(
    State(app): State<AppState>,
    payload: Result<Json<ControlRequest>, JsonRejection>,
) -> ApiResult<ControlReply> {
    let Json(req) = payload?;
    let (Some(agent), Some(action)) = (req.agent, req.action) else {
        return Err(ApiError::BadRequest(
            "Missing required parameters: agent and action".into(),
        ));
    };
    let action = ControlAction::parse(&action).ok_or_else(|| {
        ApiError::BadRequest("Invalid action. Must be start, stop, or restart".into())
    })?;
    let agent = AgentAddress::new(agent);

    app.registry
        .control(&agent, action)
        .await
        .map_err(|ControlError::UnknownAgent(a)| {
            ApiError::Internal(format!("Failed to control service: unknown agent {a}"))
        })?;

    let now = OffsetDateTime::now_utc();
    let severity = match action {
        ControlAction::Stop => Severity::Medium,
        ControlAction::Start | ControlAction::Restart => Severity::Low,
    };
    app.traps.lock().record(
        now,
        format!("Service {} requested on agent {agent}", action.as_str()),
        severity,
        agent.clone(),
        EnterpriseObject::SysStatus.oid(),
    );

    Ok(Json(ControlReply {
        status: "success".into(),
        message: format!("Service {} completed successfully", action.as_str()),
        agent,
        action,
        timestamp: now.format(&Rfc3339).unwrap_or_default(),
    }))
}

// GET /traps
async fn list_traps(State(app): State<AppState>) -> Json<Vec<TrapView>> {
    let now = OffsetDateTime::now_utc();
    let traps = app.traps.lock();
    Json(
        traps
            .recent(now, app.cfg.trap_window())
            .into_iter()
            .map(|t| t.to_view())
            .collect(),
    )
}

// GET /services
async fn list_services() -> Json<Vec<ServiceEntry>> {
    Json(service_table())
}

// POST /sessions
async fn open_session(
    State(app): State<AppState>,
    payload: Result<Json<AgentSelection>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let Json(req) = payload?;
    let agent = known_agent(&app, req.agent).await?;
    let id = app.sessions.create(agent);
    Ok((StatusCode::CREATED, Json(app.sessions.view(id)?)))
}

// DELETE /sessions/{id}
async fn close_session(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app.sessions.close(parse_session(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /sessions/{id}/mib?search=
async fn session_tree(
    State(app): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<MibSearch>, QueryRejection>,
) -> ApiResult<Vec<Arc<MibNode>>> {
    let Query(query) = query?;
    let tree = app.sessions.tree(parse_session(&id)?, &query.search)?;
    Ok(Json(tree.roots().to_vec()))
}

// POST /sessions/{id}/mib/{oid}/toggle
async fn toggle_node(
    State(app): State<AppState>,
    Path((id, oid)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    app.sessions
        .toggle(parse_session(&id)?, &parse_oid(&oid)?)?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /sessions/{id}/mib/{oid}/fetch
async fn fetch_node(
    State(app): State<AppState>,
    Path((id, oid)): Path<(String, String)>,
) -> ApiResult<FetchReply> {
    let oid = parse_oid(&oid)?;
    let (outcome, value) = app.sessions.fetch(parse_session(&id)?, oid.clone()).await?;
    let outcome = match outcome {
        ApplyOutcome::Applied => "applied",
        ApplyOutcome::Stale => "stale",
        ApplyOutcome::Ignored => "ignored",
        ApplyOutcome::Failed(err) => return Err(err.into()),
    };
    Ok(Json(FetchReply {
        oid: oid.to_text(),
        outcome: outcome.into(),
        value,
    }))
}

// PUT /sessions/{id}/agent
async fn switch_agent(
    State(app): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AgentSelection>, JsonRejection>,
) -> ApiResult<SessionView> {
    let id = parse_session(&id)?;
    let Json(req) = payload?;
    let agent = known_agent(&app, req.agent).await?;
    app.sessions.switch_agent(id, agent)?;
    Ok(Json(app.sessions.view(id)?))
}

// GET /sessions/{id}/metrics
async fn session_metrics(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DashboardMetrics> {
    Ok(Json(app.sessions.metrics(parse_session(&id)?)?))
}

// GET /sessions/{id}/charts
async fn session_charts(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ChartPoint>> {
    Ok(Json(app.sessions.charts(parse_session(&id)?)?))
}
