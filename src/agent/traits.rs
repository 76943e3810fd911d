//! Agent trait definition.
//!
//! All agents (classifier, translator, specialists, judge, front desk)
//! implement this trait, which provides a uniform interface for the
//! orchestrator.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::cancel::cancellable;
use super::executor::ToolExecutor;
use super::message::{
    ChatMessage, ChatRequest, ResponseSchema, TokenUsage, system_message, user_message,
};
use super::provider::LlmProvider;
use super::tool::ToolDefinition;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role with a fixed system prompt and model
/// configuration. Agents that support tool-calling override
/// [`Agent::tools`] and are run through [`execute_with_tools`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Schema the output must follow, if any.
    fn response_schema(&self) -> Option<ResponseSchema> {
        None
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Tool definitions available to this agent.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Maximum tool-calling loop iterations before aborting.
    fn max_tool_iterations(&self) -> usize {
        10
    }

    /// Builds the request for `user_msg`, with prior conversation turns
    /// between the system prompt and the new user message.
    fn request(&self, history: &[ChatMessage], user_msg: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(system_message(self.system_prompt()));
        messages.extend(history.iter().cloned());
        messages.push(user_message(user_msg));

        ChatRequest {
            model: self.model().to_string(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            response_schema: self.response_schema(),
            tools: self.tools(),
        }
    }

    /// Executes the agent with the given user message (no tools, no history).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or cancellation.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse, AgentError> {
        let mut request = self.request(&[], user_msg);
        request.tools.clear();

        let response = cancellable(cancel, provider.chat(&request)).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Executes a prepared request with tool-calling support.
///
/// `request` is usually built with [`Agent::request`]. It is mutated in
/// place, so after return (success or failure) it holds the full exchange.
/// If the request carries no tools, this is a single model call.
///
/// # Errors
///
/// Returns [`AgentError`] on API failures, cancellation, or if the tool loop
/// exceeds the agent's max iterations.
pub async fn execute_with_tools(
    agent: &dyn Agent,
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor,
    cancel: &CancellationToken,
) -> Result<AgentResponse, AgentError> {
    let max_iterations = if request.tools.is_empty() {
        1
    } else {
        agent.max_tool_iterations()
    };

    let response =
        super::agentic_loop::agentic_loop(provider, request, executor, max_iterations, cancel)
            .await?;

    Ok(AgentResponse {
        content: response.content,
        usage: response.usage,
        finish_reason: response.finish_reason,
    })
}
