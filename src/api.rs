use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::registry::{ensure_agent_active, ensure_key_active};
use crate::state::AppState;
use crate::types::*;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(service_info))
        // Agents
        .route("/agents", get(list_agents))
        .route("/agents/register", post(register_agent))
        .route("/agents/domain/:domain", get(get_agent_by_domain))
        .route(
            "/agents/:id",
            get(get_agent).put(update_agent).delete(deactivate_agent),
        )
        // Keys
        .route("/agents/:id/keys", get(list_agent_keys).post(add_agent_key))
        .route("/agents/:id/keys/:key_id", get(get_agent_key))
        .route("/:key_id", get(get_key))
        .with_state(state)
}

/// JSON body extractor that reports malformed bodies as 400 with the
/// registry's error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ValidJson<T>(pub T);

fn parse_agent_id(raw: &str) -> ApiResult<AgentId> {
    raw.parse()
        .map_err(|_| ApiError::bad_request_with_hint("Invalid agent ID", "Agent IDs are integers"))
}

// ============ Health ============

async fn service_info(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(state.info())
}

// ============ Agent Endpoints ============

async fn register_agent(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RegisterAgentRequest>,
) -> ApiResult<Json<AgentResponse>> {
    let domain = req.domain.clone();
    let registration = state.agents.register(req)?;

    let message = if registration.created {
        format!(
            "Agent successfully registered for domain: {}, ID: {}",
            domain, registration.agent.agent.id
        )
    } else {
        format!("Agent registration updated for domain: {}", domain)
    };

    Ok(Json(AgentResponse {
        success: true,
        message,
        agent: registration.agent,
    }))
}

#[derive(Deserialize)]
struct ListQuery {
    active_only: Option<String>,
}

async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<AgentWithKeys>>> {
    // Only the literal "false" lifts the filter
    let active_only = query.active_only.as_deref() != Some("false");
    let agents = state.agents.list(active_only)?;
    tracing::info!("Retrieved {} agents", agents.len());
    Ok(Json(agents))
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentWithKeys>> {
    let id = parse_agent_id(&id)?;
    let agent = state.agents.get(id).map_err(log_miss)?;
    ensure_agent_active(&agent.agent).map_err(log_miss)?;

    tracing::info!("Retrieved agent info for ID: {}", id);
    Ok(Json(agent))
}

async fn get_agent_by_domain(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> ApiResult<Json<AgentWithKeys>> {
    let agent = state.agents.get_by_domain(&domain).map_err(log_miss)?;
    ensure_agent_active(&agent.agent).map_err(log_miss)?;

    tracing::info!("Retrieved agent info for domain: {}", domain);
    Ok(Json(agent))
}

async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<UpdateAgentRequest>,
) -> ApiResult<Json<AgentResponse>> {
    let id = parse_agent_id(&id)?;
    let agent = state.agents.update(id, req).map_err(log_miss)?;

    Ok(Json(AgentResponse {
        success: true,
        message: format!("Agent updated for ID: {}", id),
        agent,
    }))
}

async fn deactivate_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = parse_agent_id(&id)?;
    state.agents.deactivate(id).map_err(log_miss)?;
    Ok(Json(MessageResponse::ok(format!("Agent deactivated for ID: {}", id))))
}

// ============ Key Endpoints ============

async fn get_key(
    State(state): State<Arc<AppState>>,
    Path(key_id): Path<String>,
) -> ApiResult<Json<KeyLookupResponse>> {
    let owned = state.keys.get_by_key_id(&key_id).map_err(log_miss)?;
    ensure_key_active(&owned.key).map_err(log_miss)?;
    ensure_agent_active(&owned.agent).map_err(log_miss)?;

    tracing::info!("Retrieved key '{}' (agent: {})", key_id, owned.agent.name);
    Ok(Json(KeyLookupResponse::from(&owned)))
}

async fn list_agent_keys(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<AgentKey>>> {
    let id = parse_agent_id(&id)?;
    let agent = state.agents.get(id).map_err(log_miss)?;
    ensure_agent_active(&agent.agent).map_err(log_miss)?;

    let keys = agent.keys.into_iter().filter(|k| k.is_active).collect();
    Ok(Json(keys))
}

async fn get_agent_key(
    State(state): State<Arc<AppState>>,
    Path((id, key_id)): Path<(String, String)>,
) -> ApiResult<Json<KeyLookupResponse>> {
    let id = parse_agent_id(&id)?;
    let owned = state.keys.get_for_agent(id, &key_id).map_err(log_miss)?;
    ensure_agent_active(&owned.agent).map_err(log_miss)?;
    ensure_key_active(&owned.key).map_err(log_miss)?;

    tracing::info!("Retrieved key '{}' for agent ID: {}", key_id, id);
    Ok(Json(KeyLookupResponse::from(&owned)))
}

async fn add_agent_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<NewKeyRequest>,
) -> ApiResult<Json<KeyResponse>> {
    let id = parse_agent_id(&id)?;
    let key = state.keys.add_key(id, req).map_err(log_miss)?;

    Ok(Json(KeyResponse {
        success: true,
        message: format!("Key '{}' added to agent {}", key.key_id, id),
        key,
    }))
}

fn log_miss(err: ApiError) -> ApiError {
    match &err {
        ApiError::NotFound(msg) | ApiError::Inactive(msg) => tracing::info!("{}", msg),
        ApiError::Conflict(msg) => tracing::warn!("{}", msg),
        _ => {}
    }
    err
}
