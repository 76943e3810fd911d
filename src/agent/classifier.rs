//! Query classifier (guardrail).
//!
//! Cheap first: the routing decision comes from [`local_query_type`] with no
//! model call. One structured model call then detects the language. If that
//! call fails or returns something unparseable, classification degrades to
//! an English default instead of failing the pipeline.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::message::ResponseSchema;
use super::provider::LlmProvider;
use super::structured::{ModelOutput, parse_output, response_schema};
use super::traits::Agent;
use crate::core::classification::{FALLBACK_CONFIDENCE, FALLBACK_LANGUAGE, MODEL_CONFIDENCE};
use crate::core::{QueryClassification, local_query_type};
use crate::error::AgentError;

/// Structured output of the language detection call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LanguageDetection {
    /// English name of the detected language.
    pub language: String,
    /// Whether the query is already English.
    #[serde(rename = "isEnglish", alias = "is_english")]
    pub is_english: bool,
}

/// Language detection agent plus the local routing stage.
pub struct ClassifierAgent {
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl ClassifierAgent {
    /// Creates a classifier from configuration.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.classifier_model.clone(),
            system_prompt,
            max_tokens: config.structured_max_tokens,
        }
    }

    /// Classifies `query`.
    ///
    /// # Errors
    ///
    /// Returns only [`AgentError::Cancelled`]; every other failure degrades
    /// to the English default.
    pub async fn classify(
        &self,
        provider: &dyn LlmProvider,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<QueryClassification, AgentError> {
        let local = local_query_type(query);

        let detection = match self.execute(provider, query, cancel).await {
            Ok(response) => match parse_output::<LanguageDetection>(&response.content) {
                ModelOutput::Parsed(detection) => Some(detection),
                ModelOutput::Raw(raw) => {
                    warn!(output = %raw, "classification degraded: unparseable language detection");
                    None
                }
            },
            Err(AgentError::Cancelled) => return Err(AgentError::Cancelled),
            Err(e) => {
                warn!(error = %e, "classification degraded: language detection failed");
                None
            }
        };

        let classification = match detection {
            Some(d) => QueryClassification::new(local, !d.is_english, d.language, MODEL_CONFIDENCE),
            None => QueryClassification::new(local, false, FALLBACK_LANGUAGE, FALLBACK_CONFIDENCE),
        };
        debug!(
            query_type = %classification.query_type,
            language = classification.detected_language,
            needs_translation = classification.needs_translation,
            "query classified"
        );
        Ok(classification)
    }
}

#[async_trait]
impl Agent for ClassifierAgent {
    fn name(&self) -> &'static str {
        "classifier"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn response_schema(&self) -> Option<ResponseSchema> {
        Some(response_schema::<LanguageDetection>("language_detection"))
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
