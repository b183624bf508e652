use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::AppState;
use crate::agent::{AgentClient, AgentMode, AgentResolver, BedrockRuntime};
use crate::api;
use crate::config::{AppConfig, CorsConfig};
use crate::session::SessionStore;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let runtime = BedrockRuntime::from_config(&config.aws).await;
    let resolver = AgentResolver::from_config(&config.agents);

    for mode in AgentMode::ALL {
        match resolver.default_target(mode) {
            Some(target) => info!(
                name: "agent.configured",
                mode = %mode,
                agent_id = %target.agent_id,
                agent_alias_id = %target.alias_id,
                "Agent configured"
            ),
            None => warn!(
                name: "agent.unconfigured",
                mode = %mode,
                "Agent not configured; requests must carry an agent_config override"
            ),
        }
    }

    let state = AppState {
        agents: Arc::new(AgentClient::new(Arc::new(runtime), resolver)),
        sessions: SessionStore::new(),
        config: Arc::clone(&config),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        api_prefix = %config.server.api_prefix,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!(name: "server.stopping", "Shutdown signal received");
        })
        .await?;
    Ok(())
}

/// Assemble the API under the configured prefix with CORS and access logging.
pub fn build_router(state: AppState) -> Router {
    let prefix = mount_point(&state.config.server.api_prefix);
    let cors = cors_layer(&state.config.cors);

    let router = match prefix {
        Some(prefix) => Router::new().nest(&prefix, api::router()),
        None => api::router(),
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `"api/"` becomes `Some("/api")`; an empty or root prefix mounts at the root.
fn mount_point(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_matches('/');
    (!trimmed.is_empty()).then(|| format!("/{trimmed}"))
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_origin = if cors.allowed_origins.iter().any(|origin| origin.trim() == "*") {
        // Credentials rule out a literal `*`; echo the caller's origin instead.
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_point() {
        assert_eq!(mount_point("/api"), Some("/api".to_string()));
        assert_eq!(mount_point("api/"), Some("/api".to_string()));
        assert_eq!(mount_point("/v1/kicksight/"), Some("/v1/kicksight".to_string()));
        assert_eq!(mount_point("/"), None);
        assert_eq!(mount_point(""), None);
    }
}
