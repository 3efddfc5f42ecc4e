use serde::Serialize;

use crate::channel::line::LineMessage;
use crate::config::{EnvelopeConfig, EnvelopeFormat, NoMatchPolicy};
use crate::router::FALLBACK_TEXT;
use crate::types::{FailureKind, RouteResult};

/// Shown whenever the model could not answer. The cause is only ever logged.
pub const APOLOGY_TEXT: &str = "抱歉，AI 助理暫時無法回應，請稍後再試一次。";

/// Shown when AI-backed features are requested but no model is configured.
pub const UNAVAILABLE_TEXT: &str = "AI 分析功能目前尚未開放，敬請期待。";

/// User-facing text for a failed generation.
pub fn failure_text(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Unavailable => UNAVAILABLE_TEXT,
        FailureKind::ServiceError | FailureKind::Unexpected => APOLOGY_TEXT,
    }
}

/// Platform-neutral outcome of wrapping a [`RouteResult`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedEnvelope {
    /// Plain text lines.
    Text(Vec<String>),
    /// A single rich message under the channel namespace.
    Payload(LineMessage),
    /// Nothing to say.
    Empty,
}

impl RenderedEnvelope {
    /// Serialize into the shape the given platform version expects.
    pub fn into_response(self, format: EnvelopeFormat) -> WebhookResponse {
        let messages = match self {
            RenderedEnvelope::Text(text) => vec![ResponseMessage::Text(TextBody { text })],
            RenderedEnvelope::Payload(line) => vec![ResponseMessage::Payload(Payload { line })],
            RenderedEnvelope::Empty => Vec::new(),
        };
        match format {
            EnvelopeFormat::Cx => WebhookResponse::Cx(CxResponse {
                fulfillment_response: FulfillmentResponse { messages },
            }),
            EnvelopeFormat::Es => WebhookResponse::Es(EsResponse {
                fulfillment_messages: messages,
            }),
        }
    }
}

/// Wrap a route result. `NoMatch` follows the configured policy.
pub fn build(result: RouteResult, config: &EnvelopeConfig) -> RenderedEnvelope {
    match result {
        RouteResult::PlainText(text) => RenderedEnvelope::Text(vec![text]),
        RouteResult::RichPayload(message) => RenderedEnvelope::Payload(message),
        RouteResult::NoMatch => match config.no_match {
            NoMatchPolicy::Silent => RenderedEnvelope::Empty,
            NoMatchPolicy::Fallback => RenderedEnvelope::Text(vec![FALLBACK_TEXT.to_string()]),
        },
    }
}

// ====== Wire types ======

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WebhookResponse {
    Cx(CxResponse),
    Es(EsResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CxResponse {
    pub fulfillment_response: FulfillmentResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfillmentResponse {
    pub messages: Vec<ResponseMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EsResponse {
    pub fulfillment_messages: Vec<ResponseMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMessage {
    Text(TextBody),
    Payload(Payload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBody {
    pub text: Vec<String>,
}

/// Custom payload keyed by channel; LINE's integration reads the `line` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub line: LineMessage,
}
