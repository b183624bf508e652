use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::AppState;
use crate::agent::{AgentMode, AgentResolver};

/// GET {prefix}
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "KickSight Backend API",
        "status": "running",
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let resolver = state.agents.resolver();
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "region": state.config.aws.region,
        "agents": {
            "supervisor": resolver.is_configured(AgentMode::Supervisor),
            "quicksight": resolver.is_configured(AgentMode::QuickSight),
        },
    }))
}

/// GET /agents/config
///
/// Reports the ids each agent resolves to without a request override.
pub async fn agents_config(State(state): State<AppState>) -> Json<Value> {
    let resolver = state.agents.resolver();
    Json(json!({
        "quicksight_agent": describe(resolver, AgentMode::QuickSight),
        "supervisor_agent": describe(resolver, AgentMode::Supervisor),
    }))
}

fn describe(resolver: &AgentResolver, mode: AgentMode) -> Value {
    match resolver.default_target(mode) {
        Some(target) => json!({
            "agent_id": target.agent_id,
            "agent_alias_id": target.alias_id,
            "configured": true,
        }),
        None => json!({
            "agent_id": "",
            "agent_alias_id": "",
            "configured": false,
        }),
    }
}
