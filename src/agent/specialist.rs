//! Specialist agents and the router that picks one.
//!
//! Both specialists are bounded tool-using conversations over the four
//! literature tools. They differ in prompt and in tool policy: the general
//! search specialist must resolve entities before it may search, and the
//! identifier specialist may search only after trying the full text.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::executor::{ToolExecutor, ToolPolicy};
use super::message::{ChatMessage, Role};
use super::prompt::{PromptSet, build_identifier_prompt};
use super::provider::LlmProvider;
use super::tool::{ToolBackend, ToolDefinition, ToolSet};
use super::traits::{Agent, execute_with_tools};
use crate::core::{QueryClassification, QueryType};
use crate::error::AgentError;

/// Which specialist answers a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistKind {
    /// Full-text lookup of one publication.
    IdentifierDetails,
    /// Entity-resolved literature search.
    GeneralSearch,
}

impl SpecialistKind {
    /// Selection rule: identifier queries go to the identifier specialist,
    /// everything else to general search.
    #[must_use]
    pub const fn route(classification: &QueryClassification) -> Self {
        match classification.query_type {
            QueryType::IdentifierDetails => Self::IdentifierDetails,
            QueryType::GeneralSearch | QueryType::GeneralQuestion => Self::GeneralSearch,
        }
    }

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IdentifierDetails => "identifier_details",
            Self::GeneralSearch => "general_search",
        }
    }

    /// Tool policy for this specialist's conversations.
    #[must_use]
    pub const fn policy(self) -> ToolPolicy {
        match self {
            Self::IdentifierDetails => ToolPolicy::full_text_first(),
            Self::GeneralSearch => ToolPolicy::entity_first(),
        }
    }
}

impl std::fmt::Display for SpecialistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one specialist conversation.
#[derive(Debug, Clone)]
pub struct SpecialistRun {
    /// Final answer text; empty when the specialist produced nothing.
    pub content: String,
    /// History plus every message of this invocation, without the system
    /// prompt.
    pub transcript: Vec<ChatMessage>,
    /// Tool calls forwarded to the backend.
    pub tool_calls: usize,
}

/// A tool-using specialist.
pub struct SpecialistAgent {
    kind: SpecialistKind,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    max_tool_iterations: usize,
    tools: ToolSet,
}

impl SpecialistAgent {
    /// Creates the specialist of `kind`.
    #[must_use]
    pub fn new(kind: SpecialistKind, config: &AgentConfig, prompts: &PromptSet) -> Self {
        let system_prompt = match kind {
            SpecialistKind::IdentifierDetails => prompts.identifier_specialist.clone(),
            SpecialistKind::GeneralSearch => prompts.general_search_specialist.clone(),
        };
        Self {
            kind,
            model: config.specialist_model.clone(),
            system_prompt,
            max_tokens: config.specialist_max_tokens,
            max_tool_iterations: config.max_tool_iterations,
            tools: ToolSet::literature(),
        }
    }

    /// Which specialist this is.
    #[must_use]
    pub const fn kind(&self) -> SpecialistKind {
        self.kind
    }

    /// Builds the user message for `query`.
    #[must_use]
    pub fn user_message(&self, query: &str, classification: &QueryClassification) -> String {
        match self.kind {
            SpecialistKind::IdentifierDetails => {
                build_identifier_prompt(query, classification.extracted_identifier.as_deref())
            }
            SpecialistKind::GeneralSearch => query.to_string(),
        }
    }

    /// Runs one specialist conversation.
    ///
    /// Provider failures and tool-loop overruns degrade to an empty answer;
    /// the transcript gathered so far is still returned.
    ///
    /// # Errors
    ///
    /// Returns only [`AgentError::Cancelled`].
    pub async fn run(
        &self,
        provider: &dyn LlmProvider,
        backend: Arc<dyn ToolBackend>,
        history: &[ChatMessage],
        query: &str,
        classification: &QueryClassification,
        cancel: &CancellationToken,
    ) -> Result<SpecialistRun, AgentError> {
        let executor = ToolExecutor::new(backend, self.kind.policy());
        let mut request = self.request(history, &self.user_message(query, classification));

        info!(specialist = %self.kind, "specialist started");
        let outcome = execute_with_tools(self, provider, &mut request, &executor, cancel).await;
        let content = match outcome {
            Ok(response) => {
                debug!(
                    specialist = %self.kind,
                    tokens = response.usage.total_tokens,
                    tool_calls = executor.call_count(),
                    "specialist finished"
                );
                response.content.trim().to_string()
            }
            Err(AgentError::Cancelled) => return Err(AgentError::Cancelled),
            Err(e) => {
                warn!(specialist = %self.kind, error = %e, "specialist failed");
                String::new()
            }
        };

        let transcript = request
            .messages
            .into_iter()
            .filter(|m| m.role != Role::System)
            .collect();

        Ok(SpecialistRun {
            content,
            transcript,
            tool_calls: executor.call_count(),
        })
    }
}

#[async_trait]
impl Agent for SpecialistAgent {
    fn name(&self) -> &'static str {
        match self.kind {
            SpecialistKind::IdentifierDetails => "identifier_specialist",
            SpecialistKind::GeneralSearch => "general_search_specialist",
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.2
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        self.tools.definitions().to_vec()
    }

    fn max_tool_iterations(&self) -> usize {
        self.max_tool_iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, user_message};
    use crate::agent::tool::ToolCall;
    use crate::core::local_query_type;
    use crate::mcp::catalog::{FIND_ENTITY, SEARCH_PUBTATOR};
    use serde_json::Value;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_case::test_case;

    fn classification(query: &str) -> QueryClassification {
        QueryClassification::new(local_query_type(query), false, "English", 0.95)
    }

    #[test_case("what is 12345678 about", SpecialistKind::IdentifierDetails ; "identifier")]
    #[test_case("curcumin and inflammation", SpecialistKind::GeneralSearch ; "search")]
    #[test_case("hello there", SpecialistKind::GeneralSearch ; "greeting")]
    fn test_route(query: &str, expected: SpecialistKind) {
        assert_eq!(SpecialistKind::route(&classification(query)), expected);
    }

    /// Provider that first searches, then resolves, then answers.
    struct SearchFirst {
        turns: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for SearchFirst {
        fn name(&self) -> &'static str {
            "search-first"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let turn = self.turns.fetch_add(1, Ordering::SeqCst);
            let call = |name: &str, args: &str| ChatResponse {
                tool_calls: vec![ToolCall {
                    id: format!("c{turn}"),
                    name: name.to_string(),
                    arguments: args.to_string(),
                }],
                ..ChatResponse::default()
            };
            Ok(match turn {
                0 => call(SEARCH_PUBTATOR, r#"{"query":"@CHEMICAL_Lavender"}"#),
                1 => call(FIND_ENTITY, r#"{"query":"lavender"}"#),
                _ => ChatResponse {
                    content: format!("answer after {} messages", request.messages.len()),
                    ..ChatResponse::default()
                },
            })
        }
    }

    #[derive(Default)]
    struct RecordingBackend {
        names: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolBackend for RecordingBackend {
        async fn call_tool(
            &self,
            name: &str,
            _arguments: Value,
            _cancel: &CancellationToken,
        ) -> Result<String, AgentError> {
            if let Ok(mut names) = self.names.lock() {
                names.push(name.to_string());
            }
            Ok("[]".to_string())
        }
    }

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn specialist(kind: SpecialistKind) -> SpecialistAgent {
        SpecialistAgent::new(kind, &config(), &PromptSet::defaults())
    }

    #[tokio::test]
    async fn test_identifier_specialist_tries_full_text_before_search() {
        let agent = specialist(SpecialistKind::IdentifierDetails);
        let backend = Arc::new(RecordingBackend::default());
        let provider = SearchFirst {
            turns: AtomicUsize::new(0),
        };
        let token = CancellationToken::new();
        let query = "what is 12345678 about";

        let run = agent
            .run(&provider, backend.clone(), &[], query, &classification(query), &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));

        // The opening search is held back; only the entity lookup ran.
        let names = backend.names.lock().map(|n| n.clone()).unwrap_or_default();
        assert_eq!(names, vec![FIND_ENTITY.to_string()]);
        assert_eq!(run.tool_calls, 1);
    }

    #[tokio::test]
    async fn test_general_search_rejects_search_before_resolution() {
        let agent = specialist(SpecialistKind::GeneralSearch);
        let backend = Arc::new(RecordingBackend::default());
        let provider = SearchFirst {
            turns: AtomicUsize::new(0),
        };
        let token = CancellationToken::new();
        let history = vec![user_message("earlier")];

        let run = agent
            .run(
                &provider,
                backend.clone(),
                &history,
                "lavender, anxiety",
                &classification("lavender"),
                &token,
            )
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));

        // The premature search never reached the backend.
        let names = backend.names.lock().map(|n| n.clone()).unwrap_or_default();
        assert_eq!(names, vec![FIND_ENTITY.to_string()]);
        assert_eq!(run.tool_calls, 1);
        assert!(run.content.starts_with("answer after"));
        assert_eq!(run.transcript[0].content, "earlier");
        assert!(run.transcript.iter().all(|m| m.role != Role::System));
    }

    #[test]
    fn test_identifier_user_message_carries_pmid() {
        let agent = specialist(SpecialistKind::IdentifierDetails);
        let query = "tell me about 12345678";
        let msg = agent.user_message(query, &classification(query));
        assert!(msg.starts_with("PMID: 12345678"));
    }

    struct Failing;

    #[async_trait]
    impl LlmProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            Err(AgentError::ApiRequest {
                message: "down".to_string(),
                status: Some(502),
            })
        }
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_empty_answer() {
        let agent = specialist(SpecialistKind::GeneralSearch);
        let token = CancellationToken::new();
        let backend = Arc::new(RecordingBackend::default());
        let run = agent
            .run(&Failing, backend, &[], "q", &classification("q"), &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(run.content.is_empty());
        assert_eq!(run.transcript.len(), 1);
    }
}
