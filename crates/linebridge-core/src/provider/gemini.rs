use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::ProviderError;
use crate::types::{CompletionResponse, FinishReason, Message, Role, TokenUsage};
use crate::util::http;

use super::LlmProvider;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
pub struct GeminiProvider {
    api_key: String,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            default_model,
        }
    }

    /// Normalize model name: strip "gemini/" and "models/" prefixes.
    fn normalize_model(&self, model: &str) -> String {
        let model = model.strip_prefix("gemini/").unwrap_or(model);
        model.strip_prefix("models/").unwrap_or(model).to_string()
    }

    /// Convert messages to Gemini format.
    fn convert_messages(
        &self,
        messages: &[Message],
    ) -> (Option<serde_json::Value>, Vec<serde_json::Value>) {
        let mut system_instruction = None;
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    system_instruction = Some(json!({
                        "parts": [{"text": msg.content}]
                    }));
                }
                Role::User => {
                    contents.push(json!({
                        "role": "user",
                        "parts": [{"text": msg.content}]
                    }));
                }
                Role::Assistant => {
                    contents.push(json!({
                        "role": "model",
                        "parts": [{"text": msg.content}]
                    }));
                }
            }
        }

        (system_instruction, contents)
    }

    fn parse_response(&self, data: &serde_json::Value) -> Result<CompletionResponse, ProviderError> {
        // A prompt blocked by safety filters comes back without candidates.
        if let Some(reason) = data
            .get("promptFeedback")
            .and_then(|v| v.get("blockReason"))
            .and_then(|v| v.as_str())
        {
            return Err(ProviderError::Api {
                status: 200,
                message: format!("prompt blocked: {reason}"),
            });
        }

        let candidate = data
            .get("candidates")
            .and_then(|v| v.get(0))
            .ok_or_else(|| ProviderError::Parse("No candidates in response".to_string()))?;

        let text_content: String = candidate
            .get("content")
            .and_then(|v| v.get("parts"))
            .and_then(|v| v.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|v| v.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let finish_reason = match candidate.get("finishReason").and_then(|v| v.as_str()) {
            Some("STOP") | None => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::Safety,
            Some(_) => FinishReason::Error,
        };

        let usage = data
            .get("usageMetadata")
            .map(|u| {
                let count = |key: &str| u.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                TokenUsage {
                    prompt_tokens: count("promptTokenCount"),
                    completion_tokens: count("candidatesTokenCount"),
                    total_tokens: count("totalTokenCount"),
                }
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: if text_content.is_empty() {
                None
            } else {
                Some(text_content)
            },
            finish_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<CompletionResponse, ProviderError> {
        let model_name = self.normalize_model(model);
        let url = format!("{GEMINI_API_BASE}/models/{model_name}:generateContent");

        let (system_instruction, contents) = self.convert_messages(messages);

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": temperature,
            },
        });

        if let Some(system) = system_instruction {
            body["systemInstruction"] = system;
        }

        debug!("Gemini request with model {}", model_name);

        // Key goes in a header so it never shows up in URL-bearing error messages.
        let response = http::client()
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
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

        let data: serde_json::Value = response.json().await?;
        self.parse_response(&data)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new("k".into(), "gemini-2.0-flash".into())
    }

    #[test]
    fn test_normalize_model() {
        let p = provider();
        assert_eq!(p.normalize_model("gemini/gemini-2.0-flash"), "gemini-2.0-flash");
        assert_eq!(p.normalize_model("models/gemini-1.5-pro"), "gemini-1.5-pro");
        assert_eq!(p.normalize_model("gemini-2.0-flash"), "gemini-2.0-flash");
    }

    #[test]
    fn test_convert_messages_splits_system() {
        let p = provider();
        let (system, contents) = p.convert_messages(&[
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
        ]);
        assert_eq!(system.unwrap()["parts"][0]["text"], "be brief");
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
    }

    #[test]
    fn test_parse_response_text_and_usage() {
        let data = json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6}
        });
        let resp = provider().parse_response(&data).unwrap();
        assert_eq!(resp.content.as_deref(), Some("Hello there"));
        assert_eq!(resp.finish_reason, FinishReason::Stop);
        assert_eq!(resp.usage.total_tokens, 6);
    }

    #[test]
    fn test_parse_response_max_tokens() {
        let data = json!({
            "candidates": [{"content": {"parts": [{"text": "cut"}]}, "finishReason": "MAX_TOKENS"}]
        });
        let resp = provider().parse_response(&data).unwrap();
        assert_eq!(resp.finish_reason, FinishReason::Length);
    }

    #[test]
    fn test_parse_response_no_candidates() {
        let err = provider().parse_response(&json!({})).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn test_parse_response_blocked_prompt_is_api_error() {
        let data = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = provider().parse_response(&data).unwrap_err();
        assert!(matches!(err, ProviderError::Api { .. }));
    }
}
