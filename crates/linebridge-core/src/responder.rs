//! The optional generative-AI collaborator.
//!
//! One attempt per call, bounded by a timeout. Every failure is logged here
//! and reported to the caller only as a [`FailureKind`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{AiConfig, Config};
use crate::error::ProviderError;
use crate::provider::{self, LlmProvider};
use crate::types::{AiResponse, FailureKind, FinishReason, Message};
use crate::util::today_date;

const CHAT_SYSTEM_PROMPT: &str = "你是「彩虹城市AI助理」，一個友善、簡潔的社區助理。\
     請使用繁體中文回答；如果使用者用英文提問，就用英文回答。\
     這是 LINE 聊天，請盡量簡短，不要使用 Markdown。";

const ANALYSIS_SYSTEM_PROMPT: &str = "你是「彩虹城市AI助理」的 MBTI 分析師。\
     根據使用者提供的描述，推測最可能的 MBTI 類型，\
     並用三到五句繁體中文說明理由與建議。不要使用 Markdown。";

/// Generates replies through an [`LlmProvider`], or reports `Unavailable` when
/// no model key was configured.
#[derive(Clone)]
pub struct AiResponder {
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
    max_tokens: u32,
    temperature: f64,
    timeout: Duration,
}

impl AiResponder {
    /// Build the responder from configuration, creating a provider only when a key is set.
    pub fn from_config(config: &Config) -> Self {
        let provider = config.ai_enabled().then(|| {
            Arc::from(provider::create_provider(
                &config.ai.api_key,
                config.ai.api_base.as_deref(),
                &config.ai.model,
            )) as Arc<dyn LlmProvider>
        });
        Self::with_optional_provider(&config.ai, provider)
    }

    /// Build the responder around a given provider. The provider is discarded
    /// when `ai` carries no key, so a keyless responder never calls out.
    pub fn new(ai: &AiConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let provider = (!ai.api_key.trim().is_empty()).then_some(provider);
        Self::with_optional_provider(ai, provider)
    }

    /// A responder that always answers `Unavailable`.
    pub fn disabled() -> Self {
        Self::with_optional_provider(&AiConfig::default(), None)
    }

    fn with_optional_provider(ai: &AiConfig, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        match &provider {
            Some(p) => info!("AI responder enabled: provider={}, model={}", p.name(), ai.model),
            None => info!("AI responder disabled: no model API key configured"),
        }
        Self {
            provider,
            model: ai.model.clone(),
            max_tokens: ai.max_tokens,
            temperature: ai.temperature,
            timeout: Duration::from_secs(ai.timeout_secs.max(1)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Free-form reply to an utterance.
    pub async fn generate(&self, utterance: &str) -> AiResponse {
        self.complete(CHAT_SYSTEM_PROMPT, utterance).await
    }

    /// MBTI-style analysis of the user's self-description.
    pub async fn analyze(&self, query: &str) -> AiResponse {
        self.complete(ANALYSIS_SYSTEM_PROMPT, query).await
    }

    async fn complete(&self, system_prompt: &str, text: &str) -> AiResponse {
        let Some(provider) = &self.provider else {
            return AiResponse::Failure(FailureKind::Unavailable);
        };

        let messages = [
            Message::system(format!("{system_prompt}\n\n今天的日期: {}", today_date())),
            Message::user(text),
        ];

        let call = provider.chat(&messages, &self.model, self.max_tokens, self.temperature);
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        };

        match result {
            Ok(resp) => {
                debug!(
                    "AI reply: finish={:?}, tokens={}",
                    resp.finish_reason, resp.usage.total_tokens
                );
                if resp.finish_reason == FinishReason::Length {
                    warn!("AI reply truncated at {} tokens", self.max_tokens);
                }
                match resp.content {
                    Some(content) if !content.trim().is_empty() => {
                        AiResponse::Text(content.trim().to_string())
                    }
                    _ => {
                        warn!("AI reply had no text (finish={:?})", resp.finish_reason);
                        AiResponse::Failure(FailureKind::Unexpected)
                    }
                }
            }
            Err(e) => {
                let kind = classify(&e);
                error!("AI call failed ({}): {}", kind, e);
                AiResponse::Failure(kind)
            }
        }
    }
}

/// Remote rejections are service errors; transport, parse and timeout faults are unexpected.
fn classify(err: &ProviderError) -> FailureKind {
    match err {
        ProviderError::Api { .. } => FailureKind::ServiceError,
        ProviderError::Http(_)
        | ProviderError::Parse(_)
        | ProviderError::Timeout(_) => FailureKind::Unexpected,
    }
}
