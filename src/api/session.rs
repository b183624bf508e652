use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ApiError;
use crate::AppState;
use crate::session::{Session, SessionMessage};

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub messages: Vec<SessionMessage>,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            messages: session.messages,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    pub total: usize,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SessionCleared {
    pub message: &'static str,
    pub session_id: String,
}

/// GET /session/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, ApiError> {
    state
        .sessions
        .get(&id)
        .map(|session| Json(session.into()))
        .ok_or(ApiError::SessionNotFound(id))
}

/// DELETE /session/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionCleared>, ApiError> {
    if !state.sessions.delete(&id) {
        return Err(ApiError::SessionNotFound(id));
    }
    tracing::info!(session_id = %id, "Session cleared");
    Ok(Json(SessionCleared {
        message: "세션이 초기화되었습니다.",
        session_id: id,
    }))
}

/// GET /session
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionList> {
    let sessions: Vec<SessionSummary> = state
        .sessions
        .list()
        .into_iter()
        .map(|session| SessionSummary {
            message_count: session.message_count(),
            session_id: session.id,
            created_at: session.created_at,
        })
        .collect();

    Json(SessionList {
        total: sessions.len(),
        sessions,
    })
}
