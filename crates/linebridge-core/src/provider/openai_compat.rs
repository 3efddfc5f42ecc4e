use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::types::{CompletionResponse, FinishReason, Message, TokenUsage};
use crate::util::http;

use super::LlmProvider;

/// Any endpoint speaking the `chat/completions` protocol, reached through the
/// configured `ai.apiBase`.
pub struct OpenAiCompatProvider {
    api_key: String,
    endpoint: String,
    default_model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: String, api_base: &str, default_model: String) -> Self {
        Self {
            api_key,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            default_model,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = ChatRequest {
            model,
            messages,
            max_tokens,
            temperature,
        };

        debug!("chat/completions request to {} with model {}", self.endpoint, model);

        let response = http::client()
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let body = response.bytes().await?;
        parse_chat_response(&body)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn name(&self) -> &str {
        "openai-compat"
    }
}

fn parse_chat_response(body: &[u8]) -> Result<CompletionResponse, ProviderError> {
    let parsed: ChatResponse =
        serde_json::from_slice(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::Safety,
        _ => FinishReason::Stop,
    };

    let usage = parsed
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: choice.message.content.filter(|c| !c.is_empty()),
        finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_api_base() {
        let p = OpenAiCompatProvider::new("k".into(), "http://localhost:8000/v1/", "m".into());
        assert_eq!(p.endpoint, "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let messages = [Message::system("be brief"), Message::user("hi")];
        let body = serde_json::to_value(ChatRequest {
            model: "m",
            messages: &messages,
            max_tokens: 64,
            temperature: 0.5,
        })
        .unwrap();
        assert_eq!(body["model"], "m");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn test_parse_chat_response() {
        let body = br#"{
            "choices": [{"message": {"content": "hi"}, "finish_reason": "length"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;
        let resp = parse_chat_response(body).unwrap();
        assert_eq!(resp.content.as_deref(), Some("hi"));
        assert_eq!(resp.finish_reason, FinishReason::Length);
        assert_eq!(resp.usage.total_tokens, 4);
    }

    #[test]
    fn test_parse_chat_response_without_choices() {
        assert!(matches!(
            parse_chat_response(br#"{"error": "x"}"#),
            Err(ProviderError::Parse(_))
        ));
        assert!(matches!(
            parse_chat_response(b"not json"),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn test_null_content_is_none() {
        let body = br#"{"choices": [{"message": {"content": null}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap().content, None);
    }
}
