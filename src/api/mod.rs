//! HTTP API.
//!
//! All routes are relative; [`crate::server::build_router`] mounts them under
//! the configured prefix (default `/api`).
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /` | service banner |
//! | `GET /health` | liveness and agent configuration |
//! | `GET /agents/config` | resolved agent ids |
//! | `POST /chat` | blocking chat |
//! | `POST /chat/stream/trace` | live trace over SSE |
//! | `POST /chat/stream/mockingtrace` | canned trace over SSE |
//! | `GET /session` | session list |
//! | `GET`, `DELETE /session/{id}` | session inspection and reset |

pub mod chat;
mod error;
pub mod session;
pub mod stream;
pub mod system;

pub use chat::{ChatRequest, ChatResponse};
pub use error::ApiError;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/agents/config", get(system::agents_config))
        .route("/chat", post(chat::chat))
        .route("/chat/stream/trace", post(stream::chat_stream_trace))
        .route("/chat/stream/mockingtrace", post(stream::chat_stream_mocking_trace))
        .route("/session", get(session::list_sessions))
        .route(
            "/session/{id}",
            get(session::get_session).delete(session::delete_session),
        )
}
