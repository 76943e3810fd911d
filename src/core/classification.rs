//! Query classification produced by the guardrail stage.
//!
//! The deterministic part lives here so it can be tested without a model:
//! [`extract_identifier`] finds a standalone 7–9 digit PMID and
//! [`is_greeting`] recognises small talk. [`local_query_type`] applies the
//! tie-break order: identifier, then greeting, then general search.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Confidence assigned when the language detector answered.
pub const MODEL_CONFIDENCE: f32 = 0.95;
/// Confidence assigned when language detection degraded to the default.
pub const FALLBACK_CONFIDENCE: f32 = 0.5;
/// Language reported when detection degraded.
pub const FALLBACK_LANGUAGE: &str = "English";

static IDENTIFIER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(\d{7,9})\b").ok());

static GREETING_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:hello|hi|help|what can you|how are you)\b").ok()
});

/// Kind of query, deciding which specialist answers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Details for one publication identified by PMID.
    IdentifierDetails,
    /// Literature search over biomedical concepts.
    GeneralSearch,
    /// Greeting, help request or other small talk.
    GeneralQuestion,
}

impl QueryType {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IdentifierDetails => "identifier_details",
            Self::GeneralSearch => "general_search",
            Self::GeneralQuestion => "general_question",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured classification of one incoming query.
///
/// Invariant: `extracted_identifier.is_some()` implies
/// `query_type == QueryType::IdentifierDetails`. Construct through
/// [`QueryClassification::new`] to keep it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryClassification {
    /// Routing decision.
    pub query_type: QueryType,
    /// PMID found in the query, if any.
    pub extracted_identifier: Option<String>,
    /// Whether the query must be translated before searching.
    pub needs_translation: bool,
    /// Language the query was written in.
    pub detected_language: String,
    /// Confidence in the language detection, in `[0, 1]`.
    pub confidence: f32,
}

impl QueryClassification {
    /// Combines the local routing stage with a language verdict.
    #[must_use]
    pub fn new(
        local: LocalClassification,
        needs_translation: bool,
        detected_language: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            query_type: local.query_type,
            extracted_identifier: local.extracted_identifier,
            needs_translation,
            detected_language: detected_language.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Result of the model-free classification stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalClassification {
    /// Routing decision.
    pub query_type: QueryType,
    /// PMID found in the query, if any.
    pub extracted_identifier: Option<String>,
}

/// Returns the first standalone 7–9 digit token in `query`.
#[must_use]
pub fn extract_identifier(query: &str) -> Option<String> {
    IDENTIFIER_RE
        .as_ref()?
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Returns `true` if `query` contains a greeting or help phrase.
#[must_use]
pub fn is_greeting(query: &str) -> bool {
    GREETING_RE.as_ref().is_some_and(|re| re.is_match(query))
}

/// Runs the model-free classification stage.
#[must_use]
pub fn local_query_type(query: &str) -> LocalClassification {
    if let Some(id) = extract_identifier(query) {
        return LocalClassification {
            query_type: QueryType::IdentifierDetails,
            extracted_identifier: Some(id),
        };
    }
    let query_type = if is_greeting(query) {
        QueryType::GeneralQuestion
    } else {
        QueryType::GeneralSearch
    };
    LocalClassification {
        query_type,
        extracted_identifier: None,
    }
}
