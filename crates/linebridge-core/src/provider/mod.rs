pub mod gemini;
pub mod openai_compat;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{CompletionResponse, Message};

/// Trait for text-generation model providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// Create the provider for the configured endpoint.
///
/// With no `api_base` the native Gemini `generateContent` API is used; a
/// configured `api_base` is taken to speak the OpenAI chat-completions protocol.
pub fn create_provider(
    api_key: &str,
    api_base: Option<&str>,
    default_model: &str,
) -> Box<dyn LlmProvider> {
    match api_base.map(str::trim).filter(|b| !b.is_empty()) {
        Some(base) => Box::new(openai_compat::OpenAiCompatProvider::new(
            api_key.to_string(),
            base,
            default_model.to_string(),
        )),
        None => Box::new(gemini::GeminiProvider::new(
            api_key.to_string(),
            default_model.to_string(),
        )),
    }
}
