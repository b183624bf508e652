//! Blocking and trace-streaming invocation.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{AgentError, AgentResolver, AgentRuntime, AgentTarget, InvokeRequest};
use crate::response::AgentPayload;
use crate::trace::TraceEvent;

/// How a successful payload was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Json,
    Text,
}

/// Outcome of a blocking invocation. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentInvocationResult {
    pub success: bool,
    pub payload: Option<AgentPayload>,
    /// The completion text exactly as received.
    pub raw_text: String,
    pub error: Option<String>,
}

impl AgentInvocationResult {
    pub fn from_text(raw_text: String) -> Self {
        Self {
            success: true,
            payload: Some(AgentPayload::from_text(&raw_text)),
            raw_text,
            error: None,
        }
    }

    pub fn failure(error: &AgentError) -> Self {
        Self {
            success: false,
            payload: None,
            raw_text: String::new(),
            error: Some(error.to_string()),
        }
    }

    /// Present only on success.
    pub fn response_kind(&self) -> Option<PayloadKind> {
        self.payload.as_ref().map(|payload| match payload {
            AgentPayload::Structured(_) => PayloadKind::Json,
            AgentPayload::Text(_) => PayloadKind::Text,
        })
    }
}

/// Invokes hosted agents through an [`AgentRuntime`].
#[derive(Debug, Clone)]
pub struct AgentClient {
    runtime: Arc<dyn AgentRuntime>,
    resolver: AgentResolver,
}

impl AgentClient {
    pub fn new(runtime: Arc<dyn AgentRuntime>, resolver: AgentResolver) -> Self {
        Self { runtime, resolver }
    }

    pub fn resolver(&self) -> &AgentResolver {
        &self.resolver
    }

    /// Invoke and drain the completion into a single response.
    ///
    /// Never fails: configuration, transport and empty-response problems come
    /// back as an unsuccessful [`AgentInvocationResult`].
    pub async fn invoke(&self, target: &AgentTarget, prompt: &str, session_id: &str) -> AgentInvocationResult {
        let request = InvokeRequest {
            target: target.clone(),
            prompt: prompt.to_string(),
            session_id: session_id.to_string(),
            enable_trace: false,
        };

        info!(
            runtime = self.runtime.name(),
            agent_id = %target.agent_id,
            session_id = %session_id,
            "Invoking agent"
        );

        match self.collect_completion(request).await {
            Ok(text) if text.trim().is_empty() => {
                warn!(agent_id = %target.agent_id, "Agent returned an empty response");
                AgentInvocationResult::failure(&AgentError::EmptyResponse)
            }
            Ok(text) => {
                debug!(agent_id = %target.agent_id, length = text.len(), "Agent response collected");
                AgentInvocationResult::from_text(text)
            }
            Err(e) => {
                warn!(agent_id = %target.agent_id, error = %e, "Agent invocation failed");
                AgentInvocationResult::failure(&e)
            }
        }
    }

    async fn collect_completion(&self, request: InvokeRequest) -> Result<String, AgentError> {
        let mut upstream = self.runtime.invoke(request).await?;
        let mut text = String::new();
        while let Some(event) = upstream.next().await {
            if let TraceEvent::ResponseChunk { text: chunk } = event? {
                text.push_str(&chunk);
            }
        }
        Ok(text)
    }

    /// Invoke with tracing enabled and stream the trace.
    ///
    /// Trace events are yielded as they arrive. Completion chunks are
    /// accumulated and surfaced once, as a final [`TraceEvent::Terminal`].
    /// An upstream failure yields a single [`TraceEvent::Error`] and ends the
    /// stream. Cancelling `cancel` stops consumption without emitting anything.
    pub fn invoke_with_trace(
        &self,
        target: AgentTarget,
        prompt: String,
        session_id: String,
        cancel: CancellationToken,
    ) -> impl Stream<Item = TraceEvent> + Send + 'static {
        let runtime = Arc::clone(&self.runtime);

        async_stream::stream! {
            info!(
                runtime = runtime.name(),
                agent_id = %target.agent_id,
                session_id = %session_id,
                "Invoking agent with trace"
            );

            let request = InvokeRequest {
                target,
                prompt,
                session_id,
                enable_trace: true,
            };

            let invoked = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = runtime.invoke(request) => Some(result),
            };
            let mut upstream = match invoked {
                None => {
                    debug!("Trace invocation cancelled before the agent answered");
                    return;
                }
                Some(Ok(upstream)) => upstream,
                Some(Err(e)) => {
                    warn!(error = %e, "Agent trace invocation failed");
                    yield TraceEvent::Error { message: e.to_string() };
                    return;
                }
            };

            let mut completion = String::new();
            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    next = upstream.next() => Some(next),
                };
                match next {
                    None => {
                        debug!("Trace stream cancelled by client");
                        return;
                    }
                    Some(None) => break,
                    Some(Some(Ok(TraceEvent::ResponseChunk { text }))) => completion.push_str(&text),
                    Some(Some(Ok(event))) => {
                        yield event;
                    }
                    Some(Some(Err(e))) => {
                        warn!(error = %e, "Agent trace stream failed");
                        yield TraceEvent::Error { message: e.to_string() };
                        return;
                    }
                }
            }

            debug!(length = completion.len(), "Agent trace complete");
            yield TraceEvent::Terminal { text: completion };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ScriptedRuntime, ScriptedTurn};
    use crate::trace::Observation;
    use serde_json::json;

    fn target() -> AgentTarget {
        AgentTarget::new("AGENT", "ALIAS")
    }

    fn client(turn: ScriptedTurn) -> AgentClient {
        AgentClient::new(Arc::new(ScriptedRuntime::new(vec![turn])), AgentResolver::default())
    }

    #[tokio::test]
    async fn test_invoke_collects_chunks() {
        let client = client(ScriptedTurn::completion(["{\"chart_type\":", " \"pie\"}"]));
        let result = client.invoke(&target(), "hi", "s-1").await;
        assert!(result.success);
        assert_eq!(result.raw_text, "{\"chart_type\": \"pie\"}");
        assert_eq!(result.payload, Some(AgentPayload::Structured(json!({"chart_type": "pie"}))));
        assert_eq!(result.response_kind(), Some(PayloadKind::Json));
    }

    #[tokio::test]
    async fn test_invoke_empty_is_failure() {
        let client = client(ScriptedTurn::completion(["   "]));
        let result = client.invoke(&target(), "hi", "s-1").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("empty response"));
        assert_eq!(result.response_kind(), None);
    }

    #[tokio::test]
    async fn test_invoke_transport_error_is_verbatim() {
        let client = client(ScriptedTurn::failing_call("dispatch failure: connection refused"));
        let result = client.invoke(&target(), "hi", "s-1").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("dispatch failure: connection refused"));
    }

    #[tokio::test]
    async fn test_trace_accumulates_completion_into_terminal() {
        let turn = ScriptedTurn::events(vec![
            Ok(TraceEvent::Reasoning { text: "plan".into() }),
            Ok(TraceEvent::ResponseChunk { text: "not ".into() }),
            Ok(TraceEvent::SubAgentInvocation { name: "quicksight-viz".into() }),
            Ok(TraceEvent::ResponseChunk { text: "json".into() }),
        ]);
        let events: Vec<TraceEvent> = client(turn)
            .invoke_with_trace(target(), "q".into(), "s".into(), CancellationToken::new())
            .collect()
            .await;
        assert_eq!(
            events,
            vec![
                TraceEvent::Reasoning { text: "plan".into() },
                TraceEvent::SubAgentInvocation { name: "quicksight-viz".into() },
                TraceEvent::Terminal { text: "not json".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_trace_error_mid_stream_terminates() {
        let turn = ScriptedTurn::events(vec![
            Ok(TraceEvent::SubAgentObservation(Observation::KnowledgeBaseLookup { references_count: 2 })),
            Err(AgentError::Transport("stream reset".into())),
            Ok(TraceEvent::Reasoning { text: "never".into() }),
        ]);
        let events: Vec<TraceEvent> = client(turn)
            .invoke_with_trace(target(), "q".into(), "s".into(), CancellationToken::new())
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], TraceEvent::Error { message: "stream reset".into() });
    }

    #[tokio::test]
    async fn test_trace_cancelled_yields_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let turn = ScriptedTurn::events(vec![Ok(TraceEvent::Reasoning { text: "plan".into() })]);
        let events: Vec<TraceEvent> = client(turn)
            .invoke_with_trace(target(), "q".into(), "s".into(), cancel)
            .collect()
            .await;
        assert!(events.is_empty());
    }
}
