//! The orchestration-platform side of the webhook: turning an inbound
//! Dialogflow request into an [`InboundRequest`](crate::types::InboundRequest)
//! and a [`RouteResult`](crate::types::RouteResult) back into the JSON it expects.

pub mod envelope;
pub mod request;

pub use envelope::{build, failure_text, RenderedEnvelope, WebhookResponse};
pub use request::{parse_request, request_from_value};
