use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};

use crate::service::AppState;
use crate::types::InboundRequest;

/// Webhook bodies are small JSON documents. Anything bigger is routed like a
/// malformed body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the axum Router with the webhook and health routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handle_webhook))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /: fulfillment webhook. Always answers 200 with an envelope.
async fn handle_webhook(State(state): State<Arc<AppState>>, body: Body) -> impl IntoResponse {
    let span = info_span!("webhook", request_id = %uuid::Uuid::new_v4());
    async move {
        let response = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => {
                info!("Webhook received: {} bytes", bytes.len());
                state.fulfill_body(&bytes).await
            }
            Err(e) => {
                warn!("Webhook body unreadable or over {} bytes: {}", MAX_BODY_BYTES, e);
                state.fulfill(&InboundRequest::default()).await
            }
        };
        (StatusCode::OK, Json(response))
    }
    .instrument(span)
    .await
}

/// GET /health: health check
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Start the HTTP server on the given address.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}
