//! Research pipeline and judge loop with stub models and tools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pubtator_agents::agent::{
    AgentConfig, ChatRequest, ChatResponse, JudgeLoop, JudgeOutcome, LlmProvider, Orchestrator,
    PromptSet, SpecialistKind, ToolBackend, ToolCall,
};
use pubtator_agents::error::AgentError;
use pubtator_agents::session::{SessionState, SessionStore};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Model stub keyed by model name.
struct StubModels {
    language: &'static str,
    translation: &'static str,
    judge_score: &'static str,
    specialist_inputs: Mutex<Vec<String>>,
    classifier_calls: AtomicUsize,
    judge_calls: AtomicUsize,
}

impl StubModels {
    fn new(language: &'static str, translation: &'static str, judge_score: &'static str) -> Self {
        Self {
            language,
            translation,
            judge_score,
            specialist_inputs: Mutex::new(Vec::new()),
            classifier_calls: AtomicUsize::new(0),
            judge_calls: AtomicUsize::new(0),
        }
    }

    fn specialist_inputs(&self) -> Vec<String> {
        self.specialist_inputs
            .lock()
            .map(|i| i.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for StubModels {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let last = request.messages.last();
        let text = |content: String| {
            Ok(ChatResponse {
                content,
                ..ChatResponse::default()
            })
        };

        match request.model.as_str() {
            "classifier" => {
                self.classifier_calls.fetch_add(1, Ordering::SeqCst);
                let is_english = self.language == "English";
                text(json!({"language": self.language, "isEnglish": is_english}).to_string())
            }
            "translator" => text(self.translation.to_string()),
            "judge" => {
                self.judge_calls.fetch_add(1, Ordering::SeqCst);
                let verdict = json!({
                    "score": self.judge_score,
                    "feedback": "Needs citations.",
                    "suggestions": ["Cite PMIDs"]
                });
                text(verdict.to_string())
            }
            "front_desk" => text("Lavanda reduz a ansiedade [PMID 30000001].".to_string()),
            _ => {
                // Specialist: resolve once, then answer from the tool result.
                match last.map(|m| m.role) {
                    Some(pubtator_agents::agent::Role::User) => {
                        if let (Ok(mut inputs), Some(m)) = (self.specialist_inputs.lock(), last) {
                            inputs.push(m.content.clone());
                        }
                        Ok(ChatResponse {
                            tool_calls: vec![ToolCall {
                                id: "call_1".to_string(),
                                name: "find_entity".to_string(),
                                arguments: r#"{"query":"lavender"}"#.to_string(),
                            }],
                            ..ChatResponse::default()
                        })
                    }
                    _ => text("Lavender reduces anxiety [PMID 30000001].".to_string()),
                }
            }
        }
    }
}

/// Tool backend that resolves every query to one chemical.
#[derive(Default)]
struct StubTools {
    calls: AtomicUsize,
}

#[async_trait]
impl ToolBackend for StubTools {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        _cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!([{"_id": "@CHEMICAL_Lavender", "tool": name, "args": arguments}]).to_string())
    }
}

fn config(max_attempts: usize) -> AgentConfig {
    AgentConfig::builder()
        .api_key("test")
        .classifier_model("classifier")
        .translator_model("translator")
        .specialist_model("specialist")
        .judge_model("judge")
        .front_desk_model("front_desk")
        .max_attempts(max_attempts)
        .build()
        .unwrap_or_else(|e| unreachable!("{e}"))
}

fn orchestrator(
    models: &Arc<StubModels>,
    tools: &Arc<StubTools>,
    max_attempts: usize,
) -> Orchestrator {
    Orchestrator::with_prompts(
        Arc::clone(models) as Arc<dyn LlmProvider>,
        Arc::clone(tools) as Arc<dyn ToolBackend>,
        config(max_attempts),
        PromptSet::defaults(),
    )
}

fn store() -> (TempDir, SessionStore) {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let store = SessionStore::new(dir.path().join("session.json"));
    (dir, store)
}

#[tokio::test]
async fn test_non_english_query_is_translated_before_research() {
    let models = Arc::new(StubModels::new("Portuguese", "lavender, anxiety", "pass"));
    let tools = Arc::new(StubTools::default());
    let orch = orchestrator(&models, &tools, 3);
    let token = CancellationToken::new();

    let outcome = orch
        .research(SessionState::new(), "lavanda para ansiedade", &token)
        .await
        .unwrap_or_else(|e| unreachable!("{e}"));

    assert!(outcome.classification.needs_translation);
    assert_eq!(outcome.classification.detected_language, "Portuguese");
    assert_eq!(outcome.effective_query, "lavender, anxiety");
    assert_eq!(models.specialist_inputs(), vec!["lavender, anxiety".to_string()]);
    assert_eq!(outcome.specialist, SpecialistKind::GeneralSearch);
    // Presented in the user's language.
    assert!(outcome.result.starts_with("Lavanda"));
    assert_eq!(tools.calls.load(Ordering::SeqCst), 1);

    let run_state = outcome.session.last_run_state.unwrap_or(Value::Null);
    assert_eq!(run_state["effectiveQuery"], "lavender, anxiety");
    assert_eq!(run_state["classification"]["needsTranslation"], true);
}

#[tokio::test]
async fn test_judge_always_failing_exhausts_attempts() {
    let models = Arc::new(StubModels::new("English", "", "fail"));
    let tools = Arc::new(StubTools::default());
    let orch = orchestrator(&models, &tools, 3);
    let (_dir, store) = store();
    let token = CancellationToken::new();

    let result = JudgeLoop::new(&orch)
        .run(&store, SessionState::new(), "lavender for anxiety", &token)
        .await
        .unwrap_or_else(|e| unreachable!("{e}"));

    assert_eq!(result.outcome, JudgeOutcome::Exhausted);
    assert_eq!(result.attempts_used, 3);
    assert_eq!(result.evaluations.len(), 3);
    assert_eq!(models.classifier_calls.load(Ordering::SeqCst), 3);
    assert_eq!(models.judge_calls.load(Ordering::SeqCst), 3);
    // Partial success is surfaced.
    assert_eq!(result.final_result, "Lavender reduces anxiety [PMID 30000001].");
    assert_eq!(result.session.total_interactions, 3);
}

#[tokio::test]
async fn test_judge_pass_on_first_attempt_runs_research_once() {
    let models = Arc::new(StubModels::new("English", "", "pass"));
    let tools = Arc::new(StubTools::default());
    let orch = orchestrator(&models, &tools, 3);
    let (_dir, store) = store();
    let token = CancellationToken::new();

    let result = JudgeLoop::new(&orch)
        .run(&store, SessionState::new(), "lavender for anxiety", &token)
        .await
        .unwrap_or_else(|e| unreachable!("{e}"));

    assert_eq!(result.outcome, JudgeOutcome::Passed);
    assert_eq!(result.attempts_used, 1);
    assert_eq!(models.specialist_inputs().len(), 1);
    assert_eq!(models.classifier_calls.load(Ordering::SeqCst), 1);

    let saved = store.load().unwrap_or_else(|e| unreachable!("{e}"));
    assert_eq!(saved.total_interactions, 1);
}

#[tokio::test]
async fn test_session_resumes_across_store_round_trip() {
    let models = Arc::new(StubModels::new("English", "", "pass"));
    let tools = Arc::new(StubTools::default());
    let orch = orchestrator(&models, &tools, 3);
    let (_dir, store) = store();
    let token = CancellationToken::new();

    let session = store.load().unwrap_or_else(|e| unreachable!("{e}"));
    let first = orch
        .ask(&store, session, "lavender", &token)
        .await
        .unwrap_or_else(|e| unreachable!("{e}"));

    let resumed = store.load().unwrap_or_else(|e| unreachable!("{e}"));
    assert_eq!(resumed.conversation_id, first.session.conversation_id);
    assert_eq!(resumed.total_interactions, 1);
    assert!(!resumed.conversation_history.is_empty());
}
