//! Translator agent.
//!
//! Turns a non-English biomedical question into English search terms. A
//! failed or empty translation is a no-op: the original query is returned
//! so the pipeline never stalls on this stage.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::error::AgentError;

/// Translates queries into English biomedical terms.
pub struct TranslatorAgent {
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl TranslatorAgent {
    /// Creates a translator from configuration.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.translator_model.clone(),
            system_prompt,
            max_tokens: config.structured_max_tokens,
        }
    }

    /// Translates `query`, or returns it unchanged if translation fails.
    ///
    /// # Errors
    ///
    /// Returns only [`AgentError::Cancelled`].
    pub async fn translate(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        source_language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        match self.execute(provider, query, cancel).await {
            Ok(response) => {
                let text = response.content.trim();
                if text.is_empty() {
                    warn!(language = source_language, "translation no-op: empty output");
                    Ok(query.to_string())
                } else {
                    debug!(language = source_language, translated = text, "query translated");
                    Ok(text.to_string())
                }
            }
            Err(AgentError::Cancelled) => Err(AgentError::Cancelled),
            Err(e) => {
                warn!(
                    language = source_language,
                    error = %e,
                    "translation no-op: model call failed"
                );
                Ok(query.to_string())
            }
        }
    }
}

#[async_trait]
impl Agent for TranslatorAgent {
    fn name(&self) -> &'static str {
        "translator"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::agent::prompt::TRANSLATOR_SYSTEM_PROMPT;

    struct Reply(Result<&'static str, u16>);

    #[async_trait]
    impl LlmProvider for Reply {
        fn name(&self) -> &'static str {
            "reply"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            match self.0 {
                Ok(text) => Ok(ChatResponse {
                    content: text.to_string(),
                    ..ChatResponse::default()
                }),
                Err(status) => Err(AgentError::ApiRequest {
                    message: "unavailable".to_string(),
                    status: Some(status),
                }),
            }
        }
    }

    fn translator() -> TranslatorAgent {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        TranslatorAgent::new(&config, TRANSLATOR_SYSTEM_PROMPT.to_string())
    }

    #[tokio::test]
    async fn test_translation_returns_trimmed_model_text() {
        let token = CancellationToken::new();
        let provider = Reply(Ok("  lavender, anxiety\n"));
        let out = translator()
            .translate(&provider, "lavanda para ansiedade", "Portuguese", &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(out, "lavender, anxiety");
    }

    #[tokio::test]
    async fn test_empty_or_failed_translation_keeps_original() {
        let token = CancellationToken::new();
        for provider in [Reply(Ok("   ")), Reply(Err(503))] {
            let out = translator()
                .translate(&provider, "lavanda para ansiedade", "Portuguese", &token)
                .await
                .unwrap_or_else(|e| unreachable!("{e}"));
            assert_eq!(out, "lavanda para ansiedade");
        }
    }

    #[tokio::test]
    async fn test_cancelled_translation_is_an_error() {
        let token = CancellationToken::new();
        token.cancel();
        let out = translator()
            .translate(&Reply(Ok("x")), "q", "Spanish", &token)
            .await;
        assert!(matches!(out, Err(AgentError::Cancelled)));
    }
}
