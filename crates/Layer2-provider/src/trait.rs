//! Provider trait and common types

use crate::error::ProviderError;
use crate::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model ID (e.g., "gpt-4o-mini")
    pub id: String,

    /// Provider name (e.g., "openai")
    pub provider: String,

    /// Display name
    pub display_name: String,

    /// Context window size (tokens)
    pub context_window: u32,

    /// Max output tokens
    pub max_output_tokens: u32,
}

impl ModelInfo {
    /// Create a basic model info
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            provider: provider.into(),
            context_window: 128000,
            max_output_tokens: 8192,
        }
    }
}

/// Provider metadata
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    /// Provider ID (e.g., "openai")
    pub id: String,

    /// Display name (e.g., "OpenAI")
    pub display_name: String,

    /// Endpoint the provider talks to
    pub base_url: Option<String>,
}

/// LLM Provider trait
///
/// Implement this trait to add support for a new completion backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get provider metadata
    fn metadata(&self) -> &ProviderMetadata;

    /// Get current model information
    fn model(&self) -> &ModelInfo;

    /// Send messages and get a complete response
    async fn complete(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<String>,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Check if the provider is available (e.g., API key is set)
    fn is_available(&self) -> bool;
}

/// Complete response from provider
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Text content
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Finish reason
    pub finish_reason: FinishReason,

    /// Model used (may differ from requested if the API substituted one)
    pub model: String,
}

/// Reason for completion finishing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FinishReason {
    /// Completed naturally
    Stop,

    /// Hit max tokens limit
    MaxTokens,

    /// Content filtered
    ContentFilter,

    /// Unknown/other
    #[default]
    Other,
}

impl FinishReason {
    /// Map an OpenAI-style `finish_reason` string
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::MaxTokens,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}
