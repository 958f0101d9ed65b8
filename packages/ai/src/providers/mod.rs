//! LLM provider abstraction and implementations.
//!
//! Supports `OpenAI` and Anthropic Claude via a common trait.

pub mod anthropic;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::AiError;

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "user" or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single-shot completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System prompt.
    pub system: String,
    /// Conversation so far.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends a completion request and returns the text of the answer.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the answer is empty.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `OPENAI_API_KEY` set -> `OpenAI` (`gpt-4o-mini`)
/// 2. `ANTHROPIC_API_KEY` set -> Anthropic Claude
///
/// `AI_MODEL` overrides the default model and `AI_BASE_URL` points the
/// `OpenAI` provider at a compatible self-hosted server.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = match std::env::var("AI_PROVIDER") {
        Ok(p) => p,
        Err(_) => detect_provider()
            .ok_or_else(|| AiError::Config {
                message: "No AI credentials found. Set OPENAI_API_KEY or ANTHROPIC_API_KEY"
                    .to_string(),
            })?
            .to_string(),
    };

    match provider.to_lowercase().as_str() {
        "openai" | "gpt" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| AiError::Config {
                message: "OPENAI_API_KEY environment variable not set".to_string(),
            })?;
            let model =
                std::env::var("AI_MODEL").unwrap_or_else(|_| openai::DEFAULT_MODEL.to_string());
            let mut provider = openai::OpenAiProvider::new(api_key, model);
            if let Ok(base_url) = std::env::var("AI_BASE_URL") {
                log::info!("Using OpenAI-compatible endpoint at {base_url}");
                provider = provider.with_base_url(base_url);
            }
            Ok(Box::new(provider))
        }
        "anthropic" | "claude" => {
            let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| AiError::Config {
                message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
            })?;
            let model = std::env::var("AI_MODEL")
                .unwrap_or_else(|_| anthropic::DEFAULT_MODEL.to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(api_key, model)))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'openai' or 'anthropic'."),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
fn detect_provider() -> Option<&'static str> {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
        return Some("openai");
    }

    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return Some("anthropic");
    }

    log::warn!(
        "No AI credentials detected. Set OPENAI_API_KEY or ANTHROPIC_API_KEY, \
         or AI_PROVIDER explicitly. Voice reports are disabled."
    );

    None
}
