//! Tool executor that applies call policy and forwards to a [`ToolBackend`].
//!
//! The executor is created per specialist conversation. It checks argument
//! size and validates search syntax. When the policy asks for it, it also
//! holds back `search_pubtator` until entity resolution or a full-text
//! lookup has been attempted. Every tool failure becomes an error
//! [`ToolResult`] the model can react to. Only cancellation escapes as an
//! `Err`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::tool::{ToolBackend, ToolCall, ToolResult};
use crate::error::AgentError;
use crate::mcp::catalog::{FIND_ENTITY, GET_PAPER_TEXT, SEARCH_PUBTATOR};
use crate::pubtator::validate_search_query;

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Upper bound applied to any `limit` argument.
const MAX_RESULT_LIMIT: u64 = 100;

/// Rules applied before a call reaches the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolPolicy {
    /// Reject `search_pubtator` until `find_entity` has been called once.
    pub require_entity_resolution: bool,
    /// Reject `search_pubtator` until `get_paper_text` has been called once.
    pub require_full_text_first: bool,
}

impl ToolPolicy {
    /// Policy for conversations that search by concept.
    #[must_use]
    pub const fn entity_first() -> Self {
        Self {
            require_entity_resolution: true,
            require_full_text_first: false,
        }
    }

    /// Policy for conversations about one publication: search is only a
    /// fallback after the full-text lookup.
    #[must_use]
    pub const fn full_text_first() -> Self {
        Self {
            require_entity_resolution: false,
            require_full_text_first: true,
        }
    }
}

/// Executes tool calls for one conversation.
pub struct ToolExecutor {
    backend: Arc<dyn ToolBackend>,
    policy: ToolPolicy,
    entity_resolved: AtomicBool,
    full_text_attempted: AtomicBool,
    calls: AtomicUsize,
}

impl std::fmt::Debug for ToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor")
            .field("policy", &self.policy)
            .field("calls", &self.calls.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ToolExecutor {
    /// Creates an executor over `backend` with `policy`.
    #[must_use]
    pub fn new(backend: Arc<dyn ToolBackend>, policy: ToolPolicy) -> Self {
        Self {
            backend,
            policy,
            entity_resolved: AtomicBool::new(false),
            full_text_attempted: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls forwarded to the backend so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dispatches one tool call.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Cancelled`] if `cancel` fires. Every other
    /// failure is reported in the returned [`ToolResult`].
    pub async fn execute(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<ToolResult, AgentError> {
        let arguments = match self.check(call) {
            Ok(arguments) => arguments,
            Err(message) => return Ok(error_result(call, message)),
        };

        match call.name.as_str() {
            FIND_ENTITY => self.entity_resolved.store(true, Ordering::SeqCst),
            GET_PAPER_TEXT => self.full_text_attempted.store(true, Ordering::SeqCst),
            _ => {}
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.backend.call_tool(&call.name, arguments, cancel).await {
            Ok(content) => Ok(ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            }),
            Err(AgentError::Cancelled) => Err(AgentError::Cancelled),
            Err(e) => {
                debug!(tool = call.name, error = %e, "tool call failed");
                Ok(error_result(call, e.to_string()))
            }
        }
    }

    /// Pre-dispatch checks. Returns the parsed arguments or a message for
    /// the model.
    fn check(&self, call: &ToolCall) -> Result<Value, String> {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return Err(format!(
                "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                call.arguments.len()
            ));
        }

        let mut arguments: Value = if call.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&call.arguments)
                .map_err(|e| format!("invalid arguments: {e}"))?
        };

        if let Some(limit) = arguments.get_mut("limit")
            && limit.as_u64().is_some_and(|n| n > MAX_RESULT_LIMIT)
        {
            *limit = json!(MAX_RESULT_LIMIT);
        }

        if call.name == SEARCH_PUBTATOR {
            if self.policy.require_entity_resolution && !self.entity_resolved.load(Ordering::SeqCst)
            {
                return Err(
                    "resolve every biomedical concept with find_entity before calling \
                     search_pubtator"
                        .to_string(),
                );
            }
            if self.policy.require_full_text_first
                && !self.full_text_attempted.load(Ordering::SeqCst)
            {
                return Err(
                    "call get_paper_text for the identifier first; search_pubtator is \
                     only a fallback"
                        .to_string(),
                );
            }
            let query = arguments
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default();
            validate_search_query(query).map_err(|e| e.to_string())?;
        }

        Ok(arguments)
    }
}

fn error_result(call: &ToolCall, message: String) -> ToolResult {
    ToolResult {
        tool_call_id: call.id.clone(),
        content: message,
        is_error: true,
    }
}
