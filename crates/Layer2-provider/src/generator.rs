//! Code generator
//!
//! Renders the instruction template around a brief and asks the provider
//! for the application source. The reply is used verbatim.

use crate::{
    error::ProviderError,
    r#trait::Provider,
    Message,
};
use pagesmith_foundation::{
    config::{BRIEF_PLACEHOLDER, DEFAULT_INSTRUCTION_TEMPLATE},
    with_retry, RetryConfig,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Generates a web app from a brief through an LLM provider
pub struct CodeGenerator {
    provider: Arc<dyn Provider>,
    template: String,
    retry: RetryConfig,
}

impl CodeGenerator {
    /// Create with the default template and no retries
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            template: DEFAULT_INSTRUCTION_TEMPLATE.to_string(),
            retry: RetryConfig::no_retry(),
        }
    }

    /// Replace the instruction template (`{brief}` marks the insertion point)
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Set retry configuration
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Prompt sent for `brief`
    pub fn render_prompt(&self, brief: &str) -> String {
        self.template.replace(BRIEF_PLACEHOLDER, brief)
    }

    /// Generate the application source for `brief`
    pub async fn generate(&self, brief: &str) -> Result<String, ProviderError> {
        let prompt = self.render_prompt(brief);
        let model = self.provider.model().id.clone();
        debug!("Generating with {} ({} prompt chars)", model, prompt.len());

        let response = with_retry(&self.retry, "code generation", || {
            let messages = vec![Message::user(prompt.clone())];
            async move { self.provider.complete(messages, None).await }
        })
        .await?;

        info!(
            "Generated {} chars with {} (finish={:?}, tokens in/out={}/{})",
            response.content.len(),
            response.model,
            response.finish_reason,
            response.usage.input_tokens,
            response.usage.output_tokens
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#trait::{FinishReason, ModelInfo, ProviderMetadata, ProviderResponse, TokenUsage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct EchoProvider {
        metadata: ProviderMetadata,
        model: ModelInfo,
        prompts: Mutex<Vec<String>>,
        failures_left: AtomicU32,
    }

    impl EchoProvider {
        fn new(failures: u32) -> Self {
            Self {
                metadata: ProviderMetadata {
                    id: "echo".to_string(),
                    display_name: "Echo".to_string(),
                    base_url: None,
                },
                model: ModelInfo::new("echo-1", "echo"),
                prompts: Mutex::new(Vec::new()),
                failures_left: AtomicU32::new(failures),
            }
        }
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn metadata(&self) -> &ProviderMetadata {
            &self.metadata
        }

        fn model(&self) -> &ModelInfo {
            &self.model
        }

        async fn complete(
            &self,
            messages: Vec<Message>,
            _system_prompt: Option<String>,
        ) -> Result<ProviderResponse, ProviderError> {
            let prompt = messages[0].content.clone();
            self.prompts.lock().unwrap().push(prompt.clone());

            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(ProviderError::ServerError("try again".to_string()));
            }

            Ok(ProviderResponse {
                content: format!("<!-- {} -->", prompt),
                usage: TokenUsage::default(),
                finish_reason: FinishReason::Stop,
                model: "echo-1".to_string(),
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_render_prompt() {
        let generator =
            CodeGenerator::new(Arc::new(EchoProvider::new(0))).with_template("Make: {brief}!");
        assert_eq!(generator.render_prompt("a clock"), "Make: a clock!");
    }

    #[test]
    fn test_default_template_forbids_prose() {
        let generator = CodeGenerator::new(Arc::new(EchoProvider::new(0)));
        let prompt = generator.render_prompt("a clock");
        assert!(prompt.contains("a clock"));
        assert!(prompt.contains("Do not include explanations"));
    }

    #[tokio::test]
    async fn test_generate_returns_content_verbatim() {
        let provider = Arc::new(EchoProvider::new(0));
        let generator = CodeGenerator::new(provider.clone()).with_template("{brief}");

        let code = generator.generate("hello").await.unwrap();
        assert_eq!(code, "<!-- hello -->");
        assert_eq!(provider.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_does_not_retry_by_default() {
        let provider = Arc::new(EchoProvider::new(1));
        let generator = CodeGenerator::new(provider.clone());

        assert!(generator.generate("hello").await.is_err());
        assert_eq!(provider.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_retries_when_configured() {
        let provider = Arc::new(EchoProvider::new(2));
        let generator = CodeGenerator::new(provider.clone()).with_retry_config(RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            jitter: false,
            ..Default::default()
        });

        assert!(generator.generate("hello").await.is_ok());
        assert_eq!(provider.prompts.lock().unwrap().len(), 3);
    }
}
