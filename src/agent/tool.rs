//! Tool type definitions for function-calling.
//!
//! Provides provider-agnostic types for tool definitions, calls, and results,
//! plus the [`ToolBackend`] seam that specialists call through. The backend
//! is either the tool server child process or an in-process server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::mcp::catalog::tool_catalog;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the tool server catalog).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (JSON text on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// Something that can run a named literature tool.
///
/// Calls on one backend are issued strictly one at a time by the agentic
/// loop; implementations that share a connection must still serialize.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Runs `name` with JSON `arguments` and returns the tool's text payload.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] when the tool reports a failure,
    /// [`AgentError::ToolServer`] when the backend itself is unusable and
    /// [`AgentError::Cancelled`] when `cancel` fires first.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError>;
}

/// A set of tool definitions scoped to an agent role.
///
/// Both specialists get the full literature catalog; the classifier,
/// translator, judge and front desk get no tools.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// The four literature tools.
    #[must_use]
    pub fn literature() -> Self {
        Self {
            definitions: tool_catalog(),
        }
    }
}
