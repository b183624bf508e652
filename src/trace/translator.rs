//! `TraceEvent` to `ClientEvent` mapping.

use chrono::{DateTime, Utc};

use super::{Observation, TraceEvent};
use crate::agent::AgentMode;
use crate::events::ClientEvent;
use crate::response::{NormalizedResponse, normalize_value, parse_json_document};

/// Maximum characters of action output echoed in `action_complete`.
pub const PREVIEW_CHARS: usize = 200;

const ELLIPSIS: &str = "...";

/// Translates one invocation's trace.
///
/// Holds only the original query and mode, which the terminal event needs to
/// normalize the final payload. Translation is otherwise stateless.
#[derive(Debug, Clone)]
pub struct TraceTranslator {
    query: String,
    mode: AgentMode,
}

impl TraceTranslator {
    pub fn new(query: impl Into<String>, mode: AgentMode) -> Self {
        Self {
            query: query.into(),
            mode,
        }
    }

    /// Translate with the current time as the event timestamp.
    pub fn translate(&self, event: &TraceEvent) -> Option<ClientEvent> {
        self.translate_at(event, Utc::now())
    }

    /// Translate with an explicit timestamp.
    ///
    /// Returns `None` for events the client never sees: completion chunks,
    /// unrecognized trace members and observations that are neither a
    /// knowledge-base lookup nor an action result.
    pub fn translate_at(&self, event: &TraceEvent, timestamp: DateTime<Utc>) -> Option<ClientEvent> {
        match event {
            TraceEvent::Reasoning { text } => Some(ClientEvent::Reasoning {
                content: text.clone(),
                timestamp,
            }),
            TraceEvent::SubAgentInvocation { name } => {
                let display_name = display_name(name);
                Some(ClientEvent::AgentStart {
                    agent: name.clone(),
                    message: format!("{display_name} 호출 중..."),
                    display_name,
                    timestamp,
                })
            }
            TraceEvent::SubAgentObservation(Observation::KnowledgeBaseLookup { references_count }) => {
                Some(ClientEvent::KnowledgeBase {
                    references_count: *references_count,
                    message: format!("Knowledge Base에서 {references_count}개의 참조를 찾았습니다."),
                    timestamp,
                })
            }
            TraceEvent::SubAgentObservation(Observation::ActionResult {
                action_group_name,
                text,
            }) => Some(ClientEvent::ActionComplete {
                action: action_group_name.clone(),
                result_preview: result_preview(text),
                message: format!("{action_group_name} 작업 완료"),
                timestamp,
            }),
            TraceEvent::Terminal { text } => Some(ClientEvent::FinalResponse {
                success: true,
                result: self.final_result(text),
                timestamp,
            }),
            TraceEvent::Error { message } => Some(ClientEvent::Error {
                error: message.clone(),
                message: None,
                timestamp,
            }),
            TraceEvent::SubAgentObservation(Observation::Other)
            | TraceEvent::ResponseChunk { .. }
            | TraceEvent::Unrecognized { .. } => None,
        }
    }

    /// Only a whole document, optionally fenced, counts as structured here;
    /// prose around an embedded object is returned verbatim.
    fn final_result(&self, text: &str) -> NormalizedResponse {
        match parse_json_document(text) {
            Some(value) => normalize_value(&value, &self.query, self.mode),
            None => NormalizedResponse::text(text.trim()),
        }
    }
}

/// Friendly name for a sub-agent, by case-insensitive substring match.
///
/// Unknown names pass through unchanged.
pub fn display_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let display = if lower.contains("refinement") {
        "Query Refinement Agent"
    } else if lower.contains("db") || lower.contains("database") {
        "Database Agent"
    } else if lower.contains("quicksight") || lower.contains("visualization") {
        "QuickSight Agent"
    } else {
        return name.to_string();
    };
    display.to_string()
}

/// First [`PREVIEW_CHARS`] characters, with an ellipsis only when truncated.
pub fn result_preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}
