//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response or the iteration limit
//! is reached. Calls are strictly sequential.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::cancel::cancellable;
use super::executor::ToolExecutor;
use super::message::{
    ChatRequest, ChatResponse, TokenUsage, assistant_message, assistant_tool_calls_message,
    tool_message,
};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// Continues until the model responds without tool calls (i.e., it produces
/// a final text answer) or `max_iterations` is reached.
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `request` - Initial chat request, mutated in place with every assistant
///   and tool message so the caller keeps the transcript even on failure.
/// * `executor` - Applies tool policy and forwards to the tool backend.
/// * `max_iterations` - Safety limit on round-trips.
/// * `cancel` - Checked around every model and tool call.
///
/// # Returns
///
/// The final [`ChatResponse`] with `usage` summed over every round.
///
/// # Errors
///
/// Returns [`AgentError::ToolLoopExceeded`] if the model keeps requesting
/// tools beyond `max_iterations`, [`AgentError::Cancelled`] on cancellation,
/// and propagates provider errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor,
    max_iterations: usize,
    cancel: &CancellationToken,
) -> Result<ChatResponse, AgentError> {
    let mut usage = TokenUsage::default();

    for iteration in 0..max_iterations {
        let mut response = cancellable(cancel, provider.chat(request)).await?;
        usage.accumulate(response.usage);

        // If no tool calls, we have a final answer
        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            request.messages.push(assistant_message(&response.content));
            response.usage = usage;
            return Ok(response);
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request.messages.push(assistant_tool_calls_message(
            &response.content,
            response.tool_calls.clone(),
        ));

        for call in &response.tool_calls {
            let result = executor.execute(call, cancel).await?;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
        }
    }

    Err(AgentError::ToolLoopExceeded { max_iterations })
}
