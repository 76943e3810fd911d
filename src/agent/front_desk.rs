//! Front desk presenter.
//!
//! Re-presents a specialist's findings in the language the user wrote in.
//! Presentation only: when localization is off, the query was English, or
//! the model call fails, the specialist text is returned untouched.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::prompt::build_front_desk_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::QueryClassification;
use crate::error::AgentError;

/// Localizes specialist answers.
pub struct FrontDeskAgent {
    model: String,
    system_prompt: String,
    max_tokens: u32,
    enabled: bool,
}

impl FrontDeskAgent {
    /// Creates the presenter from configuration.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.front_desk_model.clone(),
            system_prompt,
            max_tokens: config.specialist_max_tokens,
            enabled: config.localize,
        }
    }

    /// Whether `classification` calls for a localized answer.
    #[must_use]
    pub const fn applies_to(&self, classification: &QueryClassification) -> bool {
        self.enabled && classification.needs_translation
    }

    /// Presents `answer` to the user.
    ///
    /// # Errors
    ///
    /// Returns only [`AgentError::Cancelled`].
    pub async fn present(
        &self,
        provider: &dyn LlmProvider,
        answer: &str,
        classification: &QueryClassification,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        if !self.applies_to(classification) {
            return Ok(answer.to_string());
        }

        let prompt = build_front_desk_prompt(answer, &classification.detected_language);
        match self.execute(provider, &prompt, cancel).await {
            Ok(response) if !response.content.trim().is_empty() => {
                debug!(language = classification.detected_language, "answer localized");
                Ok(response.content.trim().to_string())
            }
            Ok(_) => {
                warn!("localization returned nothing; keeping specialist answer");
                Ok(answer.to_string())
            }
            Err(AgentError::Cancelled) => Err(AgentError::Cancelled),
            Err(e) => {
                warn!(error = %e, "localization failed; keeping specialist answer");
                Ok(answer.to_string())
            }
        }
    }
}

#[async_trait]
impl Agent for FrontDeskAgent {
    fn name(&self) -> &'static str {
        "front_desk"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::agent::prompt::FRONT_DESK_SYSTEM_PROMPT;
    use crate::core::local_query_type;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Localizer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for Localizer {
        fn name(&self) -> &'static str {
            "localizer"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AgentError::ApiRequest {
                    message: "nope".to_string(),
                    status: None,
                });
            }
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse {
                content: format!("[pt] {}", last.lines().last().unwrap_or_default()),
                ..ChatResponse::default()
            })
        }
    }

    fn desk(localize: bool) -> FrontDeskAgent {
        let config = AgentConfig::builder()
            .api_key("test")
            .localize(localize)
            .build()
            .unwrap_or_else(|_| unreachable!());
        FrontDeskAgent::new(&config, FRONT_DESK_SYSTEM_PROMPT.to_string())
    }

    fn classification(needs_translation: bool) -> QueryClassification {
        QueryClassification::new(local_query_type("q"), needs_translation, "Portuguese", 0.95)
    }

    #[tokio::test]
    async fn test_localizes_non_english_answers() {
        let provider = Localizer {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let token = CancellationToken::new();
        let out = desk(true)
            .present(&provider, "Lavender reduces anxiety (PMID 1).", &classification(true), &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(out, "[pt] Lavender reduces anxiety (PMID 1).");
    }

    #[tokio::test]
    async fn test_skips_english_and_disabled() {
        let provider = Localizer {
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let token = CancellationToken::new();
        let english = desk(true)
            .present(&provider, "a", &classification(false), &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        let disabled = desk(false)
            .present(&provider, "b", &classification(true), &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!((english.as_str(), disabled.as_str()), ("a", "b"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_specialist_text() {
        let provider = Localizer {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        let token = CancellationToken::new();
        let out = desk(true)
            .present(&provider, "original", &classification(true), &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(out, "original");
    }
}
