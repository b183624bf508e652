//! Client-facing streaming events.
//!
//! [`ClientEvent`] is the wire contract with the browser: one JSON object per
//! server-sent event, discriminated by a stable `type` tag and always carrying
//! a `timestamp`. Field names and tags must not change.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use kicksight_gateway::events::{ClientEvent, sse_event};
//!
//! let event = ClientEvent::Reasoning {
//!     content: "Refining the query".to_string(),
//!     timestamp: Utc::now(),
//! };
//! let frame = sse_event(&event);
//! assert!(frame.starts_with("data: {\"type\":\"reasoning\""));
//! assert!(frame.ends_with("\n\n"));
//! ```

use axum::body::Body;
use axum::http::{HeaderValue, header};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::response::NormalizedResponse;

/// Events streamed to the client during an agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    // ─────────────────────────────────────────────────────────────────────
    // Stream Lifecycle
    // ─────────────────────────────────────────────────────────────────────
    /// The gateway accepted the request and is calling the agent.
    StreamStart {
        message: String,
        timestamp: DateTime<Utc>,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Orchestration Progress
    // ─────────────────────────────────────────────────────────────────────
    /// A sub-agent or action group is being invoked.
    AgentStart {
        /// Raw name reported by the agent runtime.
        agent: String,
        /// Friendly name for display.
        display_name: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A reasoning step from the orchestrator.
    Reasoning {
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// Knowledge-base retrieval finished.
    KnowledgeBase {
        references_count: usize,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// An action group returned output.
    ActionComplete {
        action: String,
        /// At most 200 characters, plus `...` when truncated.
        result_preview: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Terminal
    // ─────────────────────────────────────────────────────────────────────
    /// The agent's normalized final answer. Always the last event on success.
    FinalResponse {
        success: bool,
        result: NormalizedResponse,
        timestamp: DateTime<Utc>,
    },

    /// The invocation failed. Always the last event on failure.
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl ClientEvent {
    /// An error event stamped now.
    pub fn error(error: impl Into<String>, message: Option<String>) -> Self {
        Self::Error {
            error: error.into(),
            message,
            timestamp: Utc::now(),
        }
    }

    /// The wire `type` tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::StreamStart { .. } => "stream_start",
            Self::AgentStart { .. } => "agent_start",
            Self::Reasoning { .. } => "reasoning",
            Self::KnowledgeBase { .. } => "knowledge_base",
            Self::ActionComplete { .. } => "action_complete",
            Self::FinalResponse { .. } => "final_response",
            Self::Error { .. } => "error",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::StreamStart { timestamp, .. }
            | Self::AgentStart { timestamp, .. }
            | Self::Reasoning { timestamp, .. }
            | Self::KnowledgeBase { timestamp, .. }
            | Self::ActionComplete { timestamp, .. }
            | Self::FinalResponse { timestamp, .. }
            | Self::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalResponse { .. } | Self::Error { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE framing
// ─────────────────────────────────────────────────────────────────────────────

/// Frame an event as `data: <json>\n\n`.
pub fn sse_event(event: &ClientEvent) -> String {
    let json = serde_json::to_string(event).unwrap_or_else(|e| {
        serde_json::json!({
            "type": "error",
            "error": e.to_string(),
            "timestamp": Utc::now(),
        })
        .to_string()
    });
    format!("data: {json}\n\n")
}

/// Wrap a framed event body in an SSE response.
///
/// Caching and proxy buffering are disabled so events reach the browser as
/// they are produced.
pub fn build_sse_response(body: Body) -> Response {
    let mut resp = Response::new(body);
    let h = resp.headers_mut();
    h.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    h.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    h.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    h.insert("x-accel-buffering", HeaderValue::from_static("no"));
    h.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    resp
}
