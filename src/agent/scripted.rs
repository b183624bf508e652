//! Agent runtime that replays scripted turns.
//!
//! Lets the HTTP surface and the trace pipeline run without a cloud agent,
//! in tests and during frontend work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::{AgentError, AgentRuntime, InvokeRequest, UpstreamStream};
use crate::trace::TraceEvent;

/// One scripted invocation outcome.
#[derive(Debug, Clone)]
pub struct ScriptedTurn {
    outcome: Result<Vec<Result<TraceEvent, AgentError>>, AgentError>,
    event_delay: Option<Duration>,
}

impl ScriptedTurn {
    /// Upstream events delivered in order.
    pub fn events(events: Vec<Result<TraceEvent, AgentError>>) -> Self {
        Self {
            outcome: Ok(events),
            event_delay: None,
        }
    }

    /// A completion split into chunks, with no trace.
    pub fn completion<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::events(
            chunks
                .into_iter()
                .map(|text| Ok(TraceEvent::ResponseChunk { text: text.into() }))
                .collect(),
        )
    }

    /// The invocation call itself fails.
    pub fn failing_call(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(AgentError::Transport(message.into())),
            event_delay: None,
        }
    }

    /// Sleep before each event, to imitate a live agent.
    #[must_use]
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = Some(delay);
        self
    }
}

/// Replays [`ScriptedTurn`]s in order, cycling when exhausted.
#[derive(Debug, Default)]
pub struct ScriptedRuntime {
    turns: Vec<ScriptedTurn>,
    next: AtomicUsize,
    requests: Mutex<Vec<InvokeRequest>>,
}

impl ScriptedRuntime {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns,
            next: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<InvokeRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    async fn invoke(&self, request: InvokeRequest) -> Result<UpstreamStream, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if self.turns.is_empty() {
            return Err(AgentError::Transport("no scripted turns configured".to_string()));
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.turns.len();
        let turn = self.turns[index].clone();

        let events = turn.outcome?;
        let stream = futures::stream::iter(events);
        Ok(match turn.event_delay {
            Some(delay) => stream
                .then(move |event| async move {
                    tokio::time::sleep(delay).await;
                    event
                })
                .boxed(),
            None => stream.boxed(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentTarget;

    fn request(prompt: &str) -> InvokeRequest {
        InvokeRequest {
            target: AgentTarget::new("A", "B"),
            prompt: prompt.to_string(),
            session_id: "s".to_string(),
            enable_trace: true,
        }
    }

    #[tokio::test]
    async fn test_turns_cycle_and_requests_are_recorded() {
        let runtime = ScriptedRuntime::new(vec![
            ScriptedTurn::completion(["one"]),
            ScriptedTurn::failing_call("down"),
        ]);

        let first: Vec<_> = runtime.invoke(request("1")).await.unwrap().collect().await;
        assert_eq!(first, vec![Ok(TraceEvent::ResponseChunk { text: "one".into() })]);

        let second = runtime.invoke(request("2")).await;
        assert_eq!(second.err(), Some(AgentError::Transport("down".into())));

        assert!(runtime.invoke(request("3")).await.is_ok());

        let prompts: Vec<String> = runtime.requests().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let runtime = ScriptedRuntime::default();
        assert!(runtime.invoke(request("x")).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_delay() {
        let runtime = ScriptedRuntime::new(vec![
            ScriptedTurn::completion(["a", "b"]).with_event_delay(Duration::from_millis(100)),
        ]);
        let started = tokio::time::Instant::now();
        let events: Vec<_> = runtime.invoke(request("x")).await.unwrap().collect().await;
        assert_eq!(events.len(), 2);
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
