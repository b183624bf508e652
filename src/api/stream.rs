//! Server-sent event endpoints.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ApiError;
use super::chat::ChatRequest;
use crate::AppState;
use crate::agent::{AgentClient, AgentError, AgentMode, AgentTarget};
use crate::events::{ClientEvent, build_sse_response, sse_event};
use crate::session::{Role, SessionStore};
use crate::trace::{TraceTranslator, mock_trace};

/// Attached to error events raised by the gateway itself.
const STREAM_FAILED: &str = "스트리밍 중 오류가 발생했습니다.";

/// POST /chat/stream/trace
///
/// Streams the agent's trace as it happens. The upstream invocation runs in
/// its own task and stops when the client goes away.
pub async fn chat_stream_trace(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let mode = req.mode_or(AgentMode::Supervisor)?;
    let session_id = state.sessions.get_or_create(req.session_id.as_deref());

    info!(
        session_id = %session_id,
        mode = %mode,
        "Received trace stream request"
    );

    state
        .sessions
        .append(&session_id, Role::User, Value::String(req.message.clone()));

    let target = state
        .agents
        .resolver()
        .resolve(mode, None, req.agent_config.as_ref());

    let (tx, rx) = mpsc::channel(state.config.stream.channel_capacity.max(1));
    let cancel = CancellationToken::new();
    let cancel_on_drop = cancel.clone().drop_guard();

    tokio::spawn(relay_trace(
        TraceJob {
            agents: Arc::clone(&state.agents),
            sessions: state.sessions.clone(),
            target,
            mode,
            message: req.message,
            session_id,
        },
        tx,
        cancel,
    ));

    let frames = ReceiverStream::new(rx);
    let body = async_stream::stream! {
        let _cancel_on_drop = cancel_on_drop;
        for await frame in frames {
            yield Ok::<String, Infallible>(frame);
        }
    };

    Ok(build_sse_response(Body::from_stream(body)))
}

struct TraceJob {
    agents: Arc<AgentClient>,
    sessions: SessionStore,
    target: Result<AgentTarget, AgentError>,
    mode: AgentMode,
    message: String,
    session_id: String,
}

/// Pump translated trace events into `tx` until the trace ends, the client
/// disconnects, or `cancel` fires.
async fn relay_trace(job: TraceJob, tx: mpsc::Sender<String>, cancel: CancellationToken) {
    let start = ClientEvent::StreamStart {
        message: format!("{} 분석을 시작합니다...", job.mode.display_name()),
        timestamp: Utc::now(),
    };
    if tx.send(sse_event(&start)).await.is_err() {
        return;
    }

    let target = match job.target {
        Ok(target) => target,
        Err(e) => {
            warn!(session_id = %job.session_id, error = %e, "Agent not configured");
            let event = ClientEvent::error(e.to_string(), Some(STREAM_FAILED.to_string()));
            let _ = tx.send(sse_event(&event)).await;
            return;
        }
    };

    let translator = TraceTranslator::new(job.message.clone(), job.mode);
    let trace = job
        .agents
        .invoke_with_trace(target, job.message, job.session_id.clone(), cancel);
    futures::pin_mut!(trace);

    let mut forwarded = 0usize;
    while let Some(event) = trace.next().await {
        let Some(client_event) = translator.translate(&event) else {
            debug!(event = ?event, "Dropped trace event");
            continue;
        };

        if let ClientEvent::FinalResponse { result, .. } = &client_event {
            let (_, data) = result.clone().into_parts();
            job.sessions.append(&job.session_id, Role::Assistant, data);
        }

        if tx.send(sse_event(&client_event)).await.is_err() {
            debug!(session_id = %job.session_id, "Client disconnected from trace stream");
            return;
        }
        forwarded += 1;

        if client_event.is_terminal() {
            debug!(session_id = %job.session_id, event = client_event.tag(), "Trace stream reached its last event");
            break;
        }
    }

    info!(session_id = %job.session_id, events = forwarded, "Trace stream finished");
}

/// POST /chat/stream/mockingtrace
///
/// Replays a canned supervisor trace without calling any agent.
pub async fn chat_stream_mocking_trace(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let events = mock_trace(&req.message, Utc::now());
    let interval = Duration::from_millis(state.config.stream.mock_interval_ms);
    debug!(events = events.len(), interval_ms = state.config.stream.mock_interval_ms, "Replaying mock trace");

    let body = async_stream::stream! {
        for (index, event) in events.iter().enumerate() {
            if index > 0 && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
            yield Ok::<String, Infallible>(sse_event(event));
        }
    };

    build_sse_response(Body::from_stream(body))
}
