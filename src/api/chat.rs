//! `POST /chat`: blocking invocation with a normalized response.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::ApiError;
use crate::AppState;
use crate::agent::{AgentInvocationResult, AgentMode, AgentOverride};
use crate::response::{ResponseKind, normalize};
use crate::session::Role;

/// Request body shared by the chat and streaming endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Existing session to continue; a new one is created otherwise.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Agent mode name, e.g. `"Supervisor Agent"`.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, alias = "agent_override")]
    pub agent_config: Option<AgentOverride>,
}

impl ChatRequest {
    /// The requested mode, or `default` when none was given.
    pub fn mode_or(&self, default: AgentMode) -> Result<AgentMode, ApiError> {
        match self.mode.as_deref() {
            None => Ok(default),
            Some(mode) => Ok(mode.parse()?),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// The normalized `data` body, or `{"message": ...}` on error.
    pub response: Value,
    pub session_id: String,
    pub response_type: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatResponse {
    fn new(response: Value, session_id: String, kind: ResponseKind) -> Self {
        Self {
            response,
            session_id,
            response_type: kind.as_str().to_string(),
            timestamp: Utc::now(),
        }
    }

    fn agent_error(error: &str, session_id: String) -> Self {
        Self::new(
            json!({ "message": format!("에이전트 오류: {error}") }),
            session_id,
            ResponseKind::Error,
        )
    }

    fn from_invocation(result: AgentInvocationResult, query: &str, mode: AgentMode, session_id: String) -> Self {
        match result.payload {
            Some(payload) if result.success => {
                let (kind, data) = normalize(&payload, query, mode).into_parts();
                Self::new(data, session_id, kind)
            }
            _ => Self::agent_error(result.error.as_deref().unwrap_or_default(), session_id),
        }
    }
}

/// POST /chat
///
/// Agent failures come back with HTTP 200 and `response_type: "error"`; only
/// an unknown `mode` is rejected with 400.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let mode = req.mode_or(AgentMode::QuickSight)?;
    let session_id = state.sessions.get_or_create(req.session_id.as_deref());

    info!(
        session_id = %session_id,
        mode = %mode,
        message_length = req.message.len(),
        "Received chat request"
    );

    state
        .sessions
        .append(&session_id, Role::User, Value::String(req.message.clone()));

    let response = match state
        .agents
        .resolver()
        .resolve(mode, None, req.agent_config.as_ref())
    {
        Ok(target) => {
            let result = state.agents.invoke(&target, &req.message, &session_id).await;
            ChatResponse::from_invocation(result, &req.message, mode, session_id.clone())
        }
        Err(e) => ChatResponse::agent_error(&e.to_string(), session_id.clone()),
    };

    info!(
        session_id = %session_id,
        response_type = %response.response_type,
        "Chat response ready"
    );

    state
        .sessions
        .append(&session_id, Role::Assistant, response.response.clone());

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;

    fn request(mode: Option<&str>) -> ChatRequest {
        ChatRequest {
            message: "hi".into(),
            session_id: None,
            mode: mode.map(String::from),
            agent_config: None,
        }
    }

    #[test]
    fn test_mode_defaults_and_parsing() {
        assert_eq!(request(None).mode_or(AgentMode::Supervisor).unwrap(), AgentMode::Supervisor);
        assert_eq!(
            request(Some("QuickSight Mocking Agent")).mode_or(AgentMode::Supervisor).unwrap(),
            AgentMode::QuickSight
        );
        assert!(matches!(
            request(Some("Chat Agent")).mode_or(AgentMode::QuickSight),
            Err(ApiError::UnsupportedMode(_))
        ));
    }

    #[test]
    fn test_agent_override_alias() {
        let req: ChatRequest = serde_json::from_value(json!({
            "message": "hi",
            "agent_override": {"agent_id": "A", "agent_alias_id": "B", "agent_name": "ignored"}
        }))
        .unwrap();
        let over = req.agent_config.unwrap();
        assert_eq!(over.agent_id.as_deref(), Some("A"));
        assert_eq!(over.agent_alias_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_failed_invocation_is_in_band() {
        let result = AgentInvocationResult::failure(&AgentError::Transport("throttled".into()));
        let response = ChatResponse::from_invocation(result, "q", AgentMode::QuickSight, "s".into());
        assert_eq!(response.response_type, "error");
        assert_eq!(response.response, json!({"message": "에이전트 오류: throttled"}));
    }

    #[test]
    fn test_text_invocation() {
        let result = AgentInvocationResult::from_text("  plain answer ".into());
        let response = ChatResponse::from_invocation(result, "q", AgentMode::QuickSight, "s".into());
        assert_eq!(response.response_type, "text");
        assert_eq!(response.response, json!("plain answer"));
    }
}
