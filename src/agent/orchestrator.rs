//! Research pipeline: classify, translate, route, research.
//!
//! [`Orchestrator::research`] is one atomic "answer this query" step. It
//! always produces text: a silent specialist yields [`NO_RESULTS`], and every
//! stage failure degrades locally. Only cancellation escapes.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::classifier::ClassifierAgent;
use super::config::AgentConfig;
use super::front_desk::FrontDeskAgent;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::specialist::{SpecialistAgent, SpecialistKind};
use super::tool::ToolBackend;
use super::translator::TranslatorAgent;
use crate::core::QueryClassification;
use crate::error::AgentError;
use crate::session::{SessionState, SessionStore};

/// Result text used when the specialist produced nothing.
pub const NO_RESULTS: &str = "No results found.";

/// Output of one research call.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// Answer shown to the user.
    pub result: String,
    /// Session after this call.
    pub session: SessionState,
    /// How the query was classified.
    pub classification: QueryClassification,
    /// Specialist that answered.
    pub specialist: SpecialistKind,
    /// Query the specialist received (translated if needed).
    pub effective_query: String,
}

/// Drives the research pipeline for one session at a time.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    backend: Arc<dyn ToolBackend>,
    config: AgentConfig,
    classifier: ClassifierAgent,
    translator: TranslatorAgent,
    identifier: SpecialistAgent,
    general: SpecialistAgent,
    front_desk: FrontDeskAgent,
    prompts: PromptSet,
}

impl Orchestrator {
    /// Creates an orchestrator, loading prompts from
    /// [`AgentConfig::prompt_dir`] with compiled-in fallbacks.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        backend: Arc<dyn ToolBackend>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, backend, config, prompts)
    }

    /// Creates an orchestrator with an explicit prompt set.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        backend: Arc<dyn ToolBackend>,
        config: AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        Self {
            classifier: ClassifierAgent::new(&config, prompts.classifier.clone()),
            translator: TranslatorAgent::new(&config, prompts.translator.clone()),
            identifier: SpecialistAgent::new(SpecialistKind::IdentifierDetails, &config, &prompts),
            general: SpecialistAgent::new(SpecialistKind::GeneralSearch, &config, &prompts),
            front_desk: FrontDeskAgent::new(&config, prompts.front_desk.clone()),
            provider,
            backend,
            config,
            prompts,
        }
    }

    /// Agent configuration in use.
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Prompt set in use.
    pub const fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Model provider shared by every agent.
    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    /// Answers `query`, threading `session` through.
    ///
    /// Stages run in fixed order: classifier, translator (only when the
    /// query is not English), specialist, front desk.
    ///
    /// # Errors
    ///
    /// Returns only [`AgentError::Cancelled`].
    pub async fn research(
        &self,
        mut session: SessionState,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<ResearchOutcome, AgentError> {
        let start = Instant::now();
        let provider = self.provider.as_ref();

        let classification = self.classifier.classify(provider, query, cancel).await?;

        let effective_query = if classification.needs_translation {
            self.translator
                .translate(provider, query, &classification.detected_language, cancel)
                .await?
        } else {
            query.to_string()
        };

        let kind = SpecialistKind::route(&classification);
        let specialist = match kind {
            SpecialistKind::IdentifierDetails => &self.identifier,
            SpecialistKind::GeneralSearch => &self.general,
        };
        debug!(specialist = %kind, query = effective_query, "routing query");

        let run = specialist
            .run(
                provider,
                Arc::clone(&self.backend),
                &session.conversation_history,
                &effective_query,
                &classification,
                cancel,
            )
            .await?;

        let result = if run.content.is_empty() {
            warn!(specialist = %kind, "specialist produced no output");
            NO_RESULTS.to_string()
        } else {
            self.front_desk
                .present(provider, &run.content, &classification, cancel)
                .await?
        };

        let run_state = run_state(kind, &effective_query, &classification, run.tool_calls);
        session.record_interaction(run.transcript, self.config.max_history_messages, run_state);

        info!(
            specialist = %kind,
            interactions = session.total_interactions,
            tool_calls = run.tool_calls,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "research complete"
        );

        Ok(ResearchOutcome {
            result,
            session,
            classification,
            specialist: kind,
            effective_query,
        })
    }

    /// Runs [`Self::research`] and saves the updated session.
    ///
    /// A failed save is logged; the answer is still returned.
    ///
    /// # Errors
    ///
    /// Returns only [`AgentError::Cancelled`].
    pub async fn ask(
        &self,
        store: &SessionStore,
        session: SessionState,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<ResearchOutcome, AgentError> {
        let outcome = self.research(session, query, cancel).await?;
        save_logged(store, &outcome.session);
        Ok(outcome)
    }
}

/// Saves `session`, logging instead of failing.
pub(crate) fn save_logged(store: &SessionStore, session: &SessionState) {
    if let Err(e) = store.save(session) {
        warn!(error = %e, "session save failed");
    }
}

fn run_state(
    kind: SpecialistKind,
    effective_query: &str,
    classification: &QueryClassification,
    tool_calls: usize,
) -> Value {
    json!({
        "specialist": kind,
        "effectiveQuery": effective_query,
        "classification": classification,
        "toolCalls": tool_calls,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies by model name; the specialist returns `specialist_reply`.
    struct ByModel {
        specialist_reply: &'static str,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for ByModel {
        fn name(&self) -> &'static str {
            "by-model"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.model.clone());
            }
            let content = match request.model.as_str() {
                "classifier" => r#"{"language":"English","isEnglish":true}"#,
                _ => self.specialist_reply,
            };
            Ok(ChatResponse {
                content: content.to_string(),
                ..ChatResponse::default()
            })
        }
    }

    struct NoTools;

    #[async_trait]
    impl ToolBackend for NoTools {
        async fn call_tool(
            &self,
            name: &str,
            _arguments: Value,
            _cancel: &CancellationToken,
        ) -> Result<String, AgentError> {
            Err(AgentError::ToolExecution {
                name: name.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    fn orchestrator(reply: &'static str) -> (Orchestrator, Arc<ByModel>) {
        let provider = Arc::new(ByModel {
            specialist_reply: reply,
            seen: Mutex::new(Vec::new()),
        });
        let config = AgentConfig::builder()
            .api_key("test")
            .classifier_model("classifier")
            .specialist_model("specialist")
            .max_history_messages(3)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let orch = Orchestrator::with_prompts(
            provider.clone(),
            Arc::new(NoTools),
            config,
            PromptSet::defaults(),
        );
        (orch, provider)
    }

    #[tokio::test]
    async fn test_empty_specialist_output_becomes_sentinel() {
        let (orch, _) = orchestrator("   ");
        let token = CancellationToken::new();
        let out = orch
            .research(SessionState::new(), "curcumin", &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(out.result, NO_RESULTS);
        assert_eq!(out.session.total_interactions, 1);
    }

    #[tokio::test]
    async fn test_session_is_updated_and_history_threaded() {
        let (orch, _) = orchestrator("Curcumin lowers CRP (PMID 1).");
        let token = CancellationToken::new();
        let first = orch
            .research(SessionState::new(), "curcumin", &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        let id = first.session.conversation_id.clone();
        assert_eq!(first.session.conversation_history.len(), 2);
        let run_state = first.session.last_run_state.clone().unwrap_or_default();
        assert_eq!(run_state["specialist"], "general_search");

        let second = orch
            .research(first.session, "and turmeric?", &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(second.session.conversation_id, id);
        assert_eq!(second.session.total_interactions, 2);
        // Bounded to 3 messages, restarted at a user message.
        let history = &second.session.conversation_history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "and turmeric?");
    }

    #[tokio::test]
    async fn test_identifier_query_routes_to_identifier_specialist() {
        let (orch, provider) = orchestrator("Title: X");
        let token = CancellationToken::new();
        let out = orch
            .research(SessionState::new(), "summarize 12345678", &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(out.specialist, SpecialistKind::IdentifierDetails);
        let seen = provider.seen.lock().map(|s| s.clone()).unwrap_or_default();
        // English query: no translator call, no front desk call.
        assert_eq!(seen, vec!["classifier".to_string(), "specialist".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_research_leaves_session_untouched() {
        let (orch, _) = orchestrator("x");
        let token = CancellationToken::new();
        token.cancel();
        let out = orch.research(SessionState::new(), "q", &token).await;
        assert!(matches!(out, Err(AgentError::Cancelled)));
    }
}
