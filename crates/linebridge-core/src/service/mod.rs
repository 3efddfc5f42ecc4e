//! Webhook service: shared state plus the HTTP surface.

#[cfg(feature = "http-api")]
pub mod http;

use crate::config::Config;
use crate::fulfillment::{self, WebhookResponse};
use crate::responder::AiResponder;
use crate::router::IntentRouter;
use crate::types::InboundRequest;

/// Shared, immutable application state. Built once at startup.
pub struct AppState {
    pub config: Config,
    pub router: IntentRouter,
}

impl AppState {
    /// Create AppState with an AI responder auto-configured from config.
    pub fn new(config: Config) -> Self {
        let responder = AiResponder::from_config(&config);
        Self::with_responder(config, responder)
    }

    pub fn with_responder(config: Config, responder: AiResponder) -> Self {
        let router = IntentRouter::new(config.routing.clone(), responder);
        Self { config, router }
    }

    /// Route one request and wrap the result in the configured envelope.
    pub async fn fulfill(&self, request: &InboundRequest) -> WebhookResponse {
        let result = self.router.route(request).await;
        fulfillment::build(result, &self.config.envelope).into_response(self.config.envelope.format)
    }

    /// Same as [`AppState::fulfill`] for a raw webhook body.
    pub async fn fulfill_body(&self, body: &[u8]) -> WebhookResponse {
        let request = fulfillment::parse_request(body);
        self.fulfill(&request).await
    }
}
