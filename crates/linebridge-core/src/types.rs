use serde::{Deserialize, Serialize};

use crate::channel::line::LineMessage;

/// Message role in a model conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Safety,
    Error,
}

/// A single message sent to a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Response from a model provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
}

/// Token usage information.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A webhook call from the orchestration platform, reduced to the fields routing needs.
///
/// `utterance` is always present (possibly empty) so containment checks never
/// have to deal with a missing value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    pub tag: Option<String>,
    pub utterance: String,
    pub session_id: Option<String>,
    pub current_page: Option<String>,
}

impl InboundRequest {
    pub fn new(tag: Option<&str>, utterance: impl Into<String>) -> Self {
        Self {
            tag: tag
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            utterance: utterance.into().trim().to_string(),
            session_id: None,
            current_page: None,
        }
    }

    pub fn text(utterance: impl Into<String>) -> Self {
        Self::new(None, utterance)
    }

    pub fn tagged(tag: &str) -> Self {
        Self::new(Some(tag), "")
    }
}

/// Outcome of routing one request. Exactly one variant is produced per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RouteResult {
    PlainText(String),
    RichPayload(LineMessage),
    NoMatch,
}

impl RouteResult {
    pub fn text(text: impl Into<String>) -> Self {
        RouteResult::PlainText(text.into())
    }
}

/// Why the AI responder could not produce text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The model API rejected the call (quota, auth, malformed request).
    ServiceError,
    /// No model key was configured at startup.
    Unavailable,
    /// Anything else: transport failure, timeout, unparseable reply.
    Unexpected,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::ServiceError => write!(f, "service_error"),
            FailureKind::Unavailable => write!(f, "unavailable"),
            FailureKind::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Result of a single generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiResponse {
    Text(String),
    Failure(FailureKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_message_constructors() {
        let sys = Message::system("You are helpful");
        assert_eq!(sys.role, Role::System);
        assert_eq!(sys.content, "You are helpful");
        assert_eq!(Message::user("Hello").role, Role::User);
        assert_eq!(Message::assistant("Hi").role, Role::Assistant);
    }

    #[test]
    fn test_inbound_request_trims_and_drops_empty_tag() {
        let req = InboundRequest::new(Some("  "), "  hello ");
        assert_eq!(req.tag, None);
        assert_eq!(req.utterance, "hello");

        let req = InboundRequest::tagged(" direct_menu ");
        assert_eq!(req.tag.as_deref(), Some("direct_menu"));
        assert_eq!(req.utterance, "");
    }

    #[test]
    fn test_default_request_has_empty_utterance() {
        let req = InboundRequest::default();
        assert!(req.utterance.is_empty());
        assert!(req.tag.is_none());
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::ServiceError.to_string(), "service_error");
        assert_eq!(FailureKind::Unavailable.to_string(), "unavailable");
        assert_eq!(FailureKind::Unexpected.to_string(), "unexpected");
    }
}
