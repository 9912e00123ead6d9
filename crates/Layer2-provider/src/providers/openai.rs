//! OpenAI provider implementation (chat completions, non-streaming)
//!
//! Works with any OpenAI-compatible endpoint through `base_url`.

use crate::{
    error::ProviderError,
    r#trait::{FinishReason, ModelInfo, Provider, ProviderMetadata, ProviderResponse, TokenUsage},
    Message, MessageRole,
};
use async_trait::async_trait;
use pagesmith_foundation::{ModelConfig, Secret};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const COMPLETIONS_PATH: &str = "/chat/completions";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// OpenAI chat-completions provider
pub struct OpenAiProvider {
    client: Client,
    api_key: Secret,
    model_info: ModelInfo,
    metadata: ProviderMetadata,
    max_tokens: u32,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(
        api_key: impl Into<Secret>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Result<Self, ProviderError> {
        let model_id = model.into();

        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.into(),
            model_info: Self::get_model_info(&model_id),
            metadata: Self::create_metadata(DEFAULT_API_URL),
            max_tokens,
            base_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Create from the `[model]` config section
    pub fn from_config(config: &ModelConfig) -> Result<Self, ProviderError> {
        Self::new(config.api_key.clone(), config.model.clone(), config.max_tokens)?
            .with_base_url(config.base_url.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    /// Create with custom base URL (Azure, LocalAI, proxies, ...)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = completions_endpoint(&base_url.into());
        self.metadata.base_url = Some(self.base_url.clone());
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ProviderError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    fn create_metadata(base_url: &str) -> ProviderMetadata {
        ProviderMetadata {
            id: "openai".to_string(),
            display_name: "OpenAI".to_string(),
            base_url: Some(base_url.to_string()),
        }
    }

    fn get_model_info(model_id: &str) -> ModelInfo {
        match model_id {
            "gpt-4o" | "gpt-4o-mini" => ModelInfo {
                id: model_id.to_string(),
                provider: "openai".to_string(),
                display_name: if model_id == "gpt-4o" {
                    "GPT-4o".to_string()
                } else {
                    "GPT-4o Mini".to_string()
                },
                context_window: 128000,
                max_output_tokens: 16384,
            },
            "gpt-4" => ModelInfo {
                id: "gpt-4".to_string(),
                provider: "openai".to_string(),
                display_name: "GPT-4".to_string(),
                context_window: 8192,
                max_output_tokens: 8192,
            },
            "gpt-4-turbo" => ModelInfo {
                id: "gpt-4-turbo".to_string(),
                provider: "openai".to_string(),
                display_name: "GPT-4 Turbo".to_string(),
                context_window: 128000,
                max_output_tokens: 4096,
            },
            _ => ModelInfo::new(model_id, "openai"),
        }
    }

    fn build_request(&self, messages: &[Message], system_prompt: Option<&str>) -> OpenAiRequest {
        let mut api_messages: Vec<OpenAiMessage> = vec![];

        if let Some(system) = system_prompt {
            api_messages.push(OpenAiMessage {
                role: MessageRole::System.as_str().to_string(),
                content: Some(system.to_string()),
            });
        }

        for msg in messages {
            if msg.role == MessageRole::System && system_prompt.is_some() {
                continue; // explicit system prompt wins
            }
            api_messages.push(msg.into());
        }

        OpenAiRequest {
            model: self.model_info.id.clone(),
            messages: api_messages,
            max_tokens: Some(self.max_tokens),
        }
    }

    /// Parse error response from OpenAI API
    fn parse_error_response(status: reqwest::StatusCode, body: &str) -> ProviderError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            let error = error_response.error;
            let message = error.message;

            return match error.code.as_deref() {
                Some("rate_limit_exceeded") => ProviderError::RateLimited {
                    retry_after_ms: None,
                },
                Some("context_length_exceeded") => ProviderError::ContextLengthExceeded(message),
                Some("invalid_api_key") => ProviderError::Authentication(message),
                Some("insufficient_quota") => ProviderError::QuotaExceeded(message),
                Some("model_not_found") => ProviderError::ModelNotFound(message),
                Some("content_policy_violation") => ProviderError::ContentFiltered(message),
                _ => ProviderError::from_http_status(status.as_u16(), &message),
            };
        }

        ProviderError::from_http_status(status.as_u16(), body)
    }

    /// Turn a successful response body into a `ProviderResponse`
    fn parse_completion(&self, body: &str) -> Result<ProviderResponse, ProviderError> {
        let api_response: OpenAiResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice =
            api_response.choices.into_iter().next().ok_or_else(|| {
                ProviderError::InvalidResponse("No choices in response".to_string())
            })?;

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason: FinishReason::from_api(choice.finish_reason.as_deref()),
            model: api_response
                .model
                .unwrap_or_else(|| self.model_info.id.clone()),
        })
    }
}

fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn model(&self) -> &ModelInfo {
        &self.model_info
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<String>,
    ) -> Result<ProviderResponse, ProviderError> {
        if !self.is_available() {
            return Err(ProviderError::NotConfigured("missing API key".to_string()));
        }

        let request = self.build_request(&messages, system_prompt.as_deref());
        debug!(
            "POST {} (model={}, messages={})",
            self.base_url,
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::parse_error_response(status, &body));
        }

        self.parse_completion(&body)
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
    code: Option<String>,
}

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        OpenAiMessage {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content.clone()),
        }
    }
}

/// Resolve an API base (`.../v1`) or a full endpoint to the completions URL
fn completions_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(COMPLETIONS_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, COMPLETIONS_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new("sk-test", "gpt-4o-mini", 1024).unwrap()
    }

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    #[test]
    fn test_model_info() {
        let info = OpenAiProvider::get_model_info("gpt-4o");
        assert_eq!(info.id, "gpt-4o");
        assert_eq!(info.context_window, 128000);

        let unknown = OpenAiProvider::get_model_info("my-local-model");
        assert_eq!(unknown.provider, "openai");
    }

    #[test]
    fn test_base_url_accepts_api_root() {
        let expected = "https://api.openai.com/v1/chat/completions";
        for base in [
            "https://api.openai.com/v1",
            "https://api.openai.com/v1/",
            "https://api.openai.com/v1/chat/completions",
        ] {
            let provider = provider().with_base_url(base);
            assert_eq!(provider.base_url, expected);
        }
    }

    #[test]
    fn test_build_request() {
        let request = provider().build_request(&[Message::user("Build X")], Some("Be terse"));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "Build X");
    }

    #[test]
    fn test_parse_completion() {
        let body = json!({
            "model": "gpt-4o-mini-2024",
            "choices": [{
                "message": {"role": "assistant", "content": "<html></html>"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5}
        })
        .to_string();

        let response = provider().parse_completion(&body).unwrap();
        assert_eq!(response.content, "<html></html>");
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.output_tokens, 5);
        assert_eq!(response.model, "gpt-4o-mini-2024");
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let result = provider().parse_completion(r#"{"choices": []}"#);
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_error_response() {
        let body = r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        let err = OpenAiProvider::parse_error_response(reqwest::StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, ProviderError::Authentication(_)));

        let err = OpenAiProvider::parse_error_response(
            reqwest::StatusCode::BAD_GATEWAY,
            "upstream down",
        );
        assert!(matches!(err, ProviderError::ServerError(_)));
    }

    #[tokio::test]
    async fn test_complete_against_stub() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
                Json(json!({
                    "choices": [{
                        "message": {"role": "assistant", "content": format!("<p>{}</p>", prompt)},
                        "finish_reason": "stop"
                    }]
                }))
            }),
        );
        let url = spawn_stub(router).await;

        let response = provider()
            .with_base_url(url)
            .complete(vec![Message::user("hi")], None)
            .await
            .unwrap();
        assert_eq!(response.content, "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_complete_maps_server_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "overloaded") }),
        );
        let url = spawn_stub(router).await;

        let err = provider()
            .with_base_url(url)
            .complete(vec![Message::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ServerError(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let provider = OpenAiProvider::new("", "gpt-4o-mini", 16).unwrap();
        assert!(!provider.is_available());
        let err = provider
            .complete(vec![Message::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
