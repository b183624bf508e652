//! Agent invocation.
//!
//! The gateway talks to two logical agents: the Supervisor, which
//! orchestrates sub-agents, and the QuickSight data-analysis agent. Both are
//! reached through one "invoke agent" operation abstracted by
//! [`AgentRuntime`].
//!
//! # Architecture
//!
//! - [`AgentRuntime`]: transport seam; yields provider-shaped [`TraceEvent`]s
//! - [`BedrockRuntime`]: Amazon Bedrock Agents implementation
//! - [`ScriptedRuntime`]: replays canned events, for tests and offline work
//! - [`AgentResolver`]: decides which agent id/alias a request targets
//! - [`AgentClient`]: blocking and trace-streaming invocation on top of a runtime

mod bedrock;
mod client;
mod resolve;
mod scripted;

pub use bedrock::{BedrockRuntime, TraceMapper};
pub use client::{AgentClient, AgentInvocationResult, PayloadKind};
pub use resolve::{AgentOverride, AgentResolver, AgentTarget, OVERRIDE_SENTINEL};
pub use scripted::{ScriptedRuntime, ScriptedTurn};

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use async_trait::async_trait;
use futures::Stream;
use serde::{Serialize, Serializer};

use crate::trace::TraceEvent;

// ─────────────────────────────────────────────────────────────────────────────
// Modes
// ─────────────────────────────────────────────────────────────────────────────

/// Which logical agent a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentMode {
    QuickSight,
    Supervisor,
}

impl AgentMode {
    pub const ALL: [Self; 2] = [Self::QuickSight, Self::Supervisor];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::QuickSight => "QuickSight Agent",
            Self::Supervisor => "Supervisor Agent",
        }
    }

    /// Lowercase hint used to match agent names in the config file.
    pub fn name_hint(self) -> &'static str {
        match self {
            Self::QuickSight => "quicksight",
            Self::Supervisor => "supervisor",
        }
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for AgentMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

/// A `mode` string that names no known agent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("지원하지 않는 모드입니다: {0}")]
pub struct UnsupportedMode(pub String);

impl FromStr for AgentMode {
    type Err = UnsupportedMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quicksight mocking agent" | "quicksight agent" | "quicksight" => Ok(Self::QuickSight),
            "supervisor agent" | "supervisor" => Ok(Self::Supervisor),
            _ => Err(UnsupportedMode(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime seam
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while talking to an agent.
///
/// These never escape [`AgentClient`]: the blocking path folds them into a
/// failed [`AgentInvocationResult`], the streaming path into one terminal
/// [`TraceEvent::Error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("{0}")]
    NotConfigured(String),

    /// Transport or protocol failure, message preserved from the upstream.
    #[error("{0}")]
    Transport(String),

    #[error("empty response")]
    EmptyResponse,
}

/// A fully-resolved invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub target: AgentTarget,
    pub prompt: String,
    pub session_id: String,
    pub enable_trace: bool,
}

/// Upstream events in arrival order. Completion text arrives as
/// [`TraceEvent::ResponseChunk`]s; the stream itself never emits a terminal event.
pub type UpstreamStream = Pin<Box<dyn Stream<Item = Result<TraceEvent, AgentError>> + Send>>;

/// Transport to a hosted agent.
#[async_trait]
pub trait AgentRuntime: Send + Sync + fmt::Debug {
    /// Start an invocation and return its event stream.
    async fn invoke(&self, request: InvokeRequest) -> Result<UpstreamStream, AgentError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}
