//! Judge agent and the refinement loop.
//!
//! The loop is a small state machine: `Running(n)` calls research and the
//! judge, then moves to `Passed`, `Exhausted`, or `Running(n + 1)` with the
//! judge's feedback appended to the original query. A judge that cannot
//! answer ends the loop early with the latest result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::message::ResponseSchema;
use super::orchestrator::{NO_RESULTS, Orchestrator, save_logged};
use super::prompt::{build_judge_prompt, build_retry_query};
use super::provider::LlmProvider;
use super::structured::{ModelOutput, parse_output, response_schema};
use super::traits::Agent;
use crate::core::QualityEvaluation;
use crate::error::AgentError;
use crate::session::{SessionState, SessionStore};

/// Scores answers against the original question.
pub struct JudgeAgent {
    model: String,
    system_prompt: String,
    max_tokens: u32,
}

impl JudgeAgent {
    /// Creates a judge from configuration.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.judge_model.clone(),
            system_prompt,
            max_tokens: config.structured_max_tokens,
        }
    }

    /// Evaluates `answer` for `original_query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ResponseParse`] if the output is not a
    /// [`QualityEvaluation`], and propagates provider errors and
    /// cancellation.
    pub async fn evaluate(
        &self,
        provider: &dyn LlmProvider,
        original_query: &str,
        answer: &str,
        cancel: &CancellationToken,
    ) -> Result<QualityEvaluation, AgentError> {
        let prompt = build_judge_prompt(original_query, answer);
        let response = self.execute(provider, &prompt, cancel).await?;
        match parse_output::<QualityEvaluation>(&response.content) {
            ModelOutput::Parsed(evaluation) => Ok(evaluation),
            ModelOutput::Raw(content) => Err(AgentError::ResponseParse {
                message: "judge output is not a quality evaluation".to_string(),
                content,
            }),
        }
    }
}

#[async_trait]
impl Agent for JudgeAgent {
    fn name(&self) -> &'static str {
        "judge"
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
        Some(response_schema::<QualityEvaluation>("quality_evaluation"))
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// How a judge loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeOutcome {
    /// The judge scored an attempt `pass`.
    Passed,
    /// Every attempt was used without a pass.
    Exhausted,
    /// The judge failed; the loop stopped early.
    JudgeUnavailable,
}

/// Terminal value of a judge loop.
#[derive(Debug, Clone)]
pub struct JudgeLoopResult {
    /// Latest research result.
    pub final_result: String,
    /// Session after the last attempt.
    pub session: SessionState,
    /// Research calls made.
    pub attempts_used: usize,
    /// Why the loop stopped.
    pub outcome: JudgeOutcome,
    /// One evaluation per judged attempt.
    pub evaluations: Vec<QualityEvaluation>,
}

#[derive(Clone, Copy)]
enum LoopState {
    Running(usize),
    Done(JudgeOutcome),
}

/// Research with judge-driven retries.
pub struct JudgeLoop<'a> {
    orchestrator: &'a Orchestrator,
    judge: JudgeAgent,
    max_attempts: usize,
}

impl<'a> JudgeLoop<'a> {
    /// Creates a loop over `orchestrator` with its configured attempt
    /// budget and judge prompt.
    pub fn new(orchestrator: &'a Orchestrator) -> Self {
        let config = orchestrator.config();
        Self {
            judge: JudgeAgent::new(config, orchestrator.prompts().judge.clone()),
            max_attempts: config.max_attempts.max(1),
            orchestrator,
        }
    }

    /// Attempt budget.
    pub const fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Runs the loop for `original_query`, saving the session after every
    /// attempt.
    ///
    /// # Errors
    ///
    /// Returns only [`AgentError::Cancelled`].
    pub async fn run(
        &self,
        store: &SessionStore,
        session: SessionState,
        original_query: &str,
        cancel: &CancellationToken,
    ) -> Result<JudgeLoopResult, AgentError> {
        let mut session = session;
        let mut current_query = original_query.to_string();
        let mut final_result = NO_RESULTS.to_string();
        let mut evaluations = Vec::new();
        let mut attempts_used = 0;
        let mut state = LoopState::Running(1);

        let outcome = loop {
            let attempt = match state {
                LoopState::Running(attempt) => attempt,
                LoopState::Done(outcome) => break outcome,
            };
            debug!(attempt, max_attempts = self.max_attempts, "judge loop attempt");
            let research = self.orchestrator.research(session, &current_query, cancel).await?;
            attempts_used = attempt;
            session = research.session;
            final_result = research.result;
            save_logged(store, &session);

            let evaluation = match self
                .judge
                .evaluate(self.orchestrator.provider(), original_query, &final_result, cancel)
                .await
            {
                Ok(evaluation) => evaluation,
                Err(AgentError::Cancelled) => return Err(AgentError::Cancelled),
                Err(e) => {
                    warn!(attempt, error = %e, "judge unavailable; returning latest result");
                    state = LoopState::Done(JudgeOutcome::JudgeUnavailable);
                    continue;
                }
            };

            info!(attempt, score = %evaluation.score, "answer evaluated");
            state = if evaluation.score.is_pass() {
                LoopState::Done(JudgeOutcome::Passed)
            } else if attempt >= self.max_attempts {
                LoopState::Done(JudgeOutcome::Exhausted)
            } else {
                current_query = build_retry_query(original_query, &evaluation);
                LoopState::Running(attempt + 1)
            };
            evaluations.push(evaluation);
        };

        Ok(JudgeLoopResult {
            final_result,
            session,
            attempts_used,
            outcome,
            evaluations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse};
    use crate::agent::prompt::{FEEDBACK_BLOCK_START, PromptSet};
    use crate::agent::tool::ToolBackend;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Judge replies are scripted; specialists echo their user message.
    struct Scripted {
        judge_replies: Mutex<Vec<&'static str>>,
        specialist_inputs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let content = match request.model.as_str() {
                "classifier" => r#"{"language":"English","isEnglish":true}"#.to_string(),
                "judge" => self
                    .judge_replies
                    .lock()
                    .ok()
                    .and_then(|mut r| (!r.is_empty()).then(|| r.remove(0)))
                    .unwrap_or("not json")
                    .to_string(),
                _ => {
                    if let Ok(mut inputs) = self.specialist_inputs.lock() {
                        inputs.push(last.clone());
                    }
                    format!("answer {}", last.len())
                }
            };
            Ok(ChatResponse {
                content,
                ..ChatResponse::default()
            })
        }
    }

    struct Offline;

    #[async_trait]
    impl ToolBackend for Offline {
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

    const FAIL: &str = r#"{"score":"fail","feedback":"No citations.","suggestions":["Cite PMIDs"]}"#;
    const PASS: &str = r#"{"score":"pass","feedback":"Good.","suggestions":[]}"#;

    fn setup(replies: Vec<&'static str>) -> (Orchestrator, Arc<Scripted>, TempDir, SessionStore) {
        let provider = Arc::new(Scripted {
            judge_replies: Mutex::new(replies),
            specialist_inputs: Mutex::new(Vec::new()),
        });
        let config = AgentConfig::builder()
            .api_key("test")
            .classifier_model("classifier")
            .judge_model("judge")
            .specialist_model("specialist")
            .max_attempts(3)
            .build()
            .unwrap_or_else(|_| unreachable!());
        let orch = Orchestrator::with_prompts(
            provider.clone(),
            Arc::new(Offline),
            config,
            PromptSet::defaults(),
        );
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let store = SessionStore::new(dir.path().join("session.json"));
        (orch, provider, dir, store)
    }

    #[tokio::test]
    async fn test_retries_carry_feedback_and_original_query() {
        let (orch, provider, _dir, store) = setup(vec![FAIL, PASS]);
        let token = CancellationToken::new();
        let result = JudgeLoop::new(&orch)
            .run(&store, SessionState::new(), "curcumin and crp", &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));

        assert_eq!(result.outcome, JudgeOutcome::Passed);
        assert_eq!(result.attempts_used, 2);
        assert_eq!(result.evaluations.len(), 2);
        let inputs = provider.specialist_inputs.lock().map(|i| i.clone()).unwrap_or_default();
        assert_eq!(inputs[0], "curcumin and crp");
        assert!(inputs[1].starts_with("curcumin and crp"));
        assert!(inputs[1].contains(FEEDBACK_BLOCK_START));
        assert!(inputs[1].contains("- Cite PMIDs"));
    }

    #[tokio::test]
    async fn test_judge_failure_stops_early() {
        let (orch, _provider, _dir, store) = setup(vec!["the answer looks fine"]);
        let token = CancellationToken::new();
        let result = JudgeLoop::new(&orch)
            .run(&store, SessionState::new(), "q", &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(result.outcome, JudgeOutcome::JudgeUnavailable);
        assert_eq!(result.attempts_used, 1);
        assert!(result.final_result.starts_with("answer"));
        assert!(result.evaluations.is_empty());
    }

    #[tokio::test]
    async fn test_session_saved_after_each_attempt() {
        let (orch, _provider, _dir, store) = setup(vec![FAIL, FAIL, FAIL]);
        let token = CancellationToken::new();
        let result = JudgeLoop::new(&orch)
            .run(&store, SessionState::new(), "q", &token)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(result.outcome, JudgeOutcome::Exhausted);
        let saved = store.load().unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(saved.total_interactions, 3);
        assert_eq!(saved.conversation_id, result.session.conversation_id);
    }
}
