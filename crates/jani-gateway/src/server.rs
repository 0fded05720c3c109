// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use jani_agent::ChatOrchestrator;
use jani_auth::InitDataValidator;
use jani_config::JaniConfig;
use jani_config::model::GatewayConfig;
use jani_core::JaniError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub validator: Arc<InitDataValidator>,
    /// Window used to locate the last user line on regenerate.
    pub history_limit: usize,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(config: &JaniConfig, orchestrator: Arc<ChatOrchestrator>) -> Self {
        Self {
            orchestrator,
            validator: Arc::new(InitDataValidator::from_config(&config.auth)),
            history_limit: config.chat.history_limit,
            started_at: Instant::now(),
        }
    }
}

/// Builds the application router.
///
/// - `GET /health` (public)
/// - `POST /api/chat/{character_id}/messages`
/// - `POST /api/chat/{character_id}/regenerate`
/// - `GET /api/chat/{character_id}/messages`
/// - `GET /api/chat/{character_id}/session`
/// - `GET /api/chat/{character_id}/memories`
pub fn build_router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/api/chat/{character_id}/messages",
            post(handlers::post_message).get(handlers::get_messages),
        )
        .route(
            "/api/chat/{character_id}/regenerate",
            post(handlers::post_regenerate),
        )
        .route("/api/chat/{character_id}/session", get(handlers::get_session))
        .route("/api/chat/{character_id}/memories", get(handlers::get_memories))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `host:port` and serves until `shutdown` is cancelled.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), JaniError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| JaniError::Network {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| JaniError::Network {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
