//! Agent trace translation.
//!
//! Hosted agents report their progress as a heterogeneous trace: rationale
//! text, sub-agent invocations, knowledge-base lookups, action results and
//! raw completion chunks. This module defines the provider-shaped
//! [`TraceEvent`] and translates it into the browser-facing
//! [`ClientEvent`](crate::events::ClientEvent) protocol.
//!
//! # Example
//!
//! ```rust
//! use kicksight_gateway::agent::AgentMode;
//! use kicksight_gateway::events::ClientEvent;
//! use kicksight_gateway::trace::{TraceEvent, TraceTranslator};
//!
//! let translator = TraceTranslator::new("VOC 추이", AgentMode::Supervisor);
//! let event = TraceEvent::SubAgentInvocation { name: "quicksight-viz".into() };
//! match translator.translate(&event) {
//!     Some(ClientEvent::AgentStart { display_name, .. }) => assert_eq!(display_name, "QuickSight Agent"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

mod mock;
mod translator;

pub use mock::{MOCK_EVENT_SPACING_MS, mock_trace};
pub use translator::{PREVIEW_CHARS, TraceTranslator, display_name, result_preview};

/// What a sub-agent observation carried back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// A knowledge-base retrieval finished.
    KnowledgeBaseLookup { references_count: usize },
    /// An action group (or collaborator agent) returned output.
    ActionResult { action_group_name: String, text: String },
    /// Any other observation, e.g. the orchestrator's own final answer.
    Other,
}

/// One event of an agent's trace, in provider terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// Orchestration rationale.
    Reasoning { text: String },
    /// A sub-agent or action group is being called.
    SubAgentInvocation { name: String },
    SubAgentObservation(Observation),
    /// A fragment of the completion text.
    ResponseChunk { text: String },
    /// End of invocation, with the accumulated completion text.
    Terminal { text: String },
    Error { message: String },
    /// A trace member this gateway does not surface.
    Unrecognized { kind: String },
}
