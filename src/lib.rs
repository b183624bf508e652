//! KickSight gateway
//!
//! A backend in front of hosted Bedrock agents (a Supervisor agent and a
//! QuickSight data-analysis agent). It forwards chat queries, streams the
//! agents' reasoning trace to the browser, and reshapes their answers into a
//! small set of frontend-friendly response shapes.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server with SSE streaming
//! - **Agent client**: blocking and trace-streaming invocation over a runtime seam
//! - **Trace translator**: provider trace events to the stable client event protocol
//! - **Response normalizer**: raw agent payloads to tagged response shapes
//!
//! # Modules
//!
//! - [`agent`]: agent runtimes, resolution and invocation
//! - [`trace`]: provider trace model and translation
//! - [`response`]: normalized response shapes
//! - [`events`]: client event protocol and SSE framing
//! - [`session`]: conversation history

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod agent;
pub mod api;
pub mod config;
pub mod events;
pub mod response;
pub mod server;
pub mod session;
pub mod telemetry;
pub mod trace;

use std::sync::Arc;

use crate::agent::AgentClient;
use crate::config::AppConfig;
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Agent invocation, blocking and streaming.
    pub agents: Arc<AgentClient>,
    /// Session store for conversation management.
    pub sessions: SessionStore,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
