//! Error types for pubtator-agents.
//!
//! Each layer has its own error enum: [`ToolError`] for the literature API
//! and tool server, [`AgentError`] for model calls and orchestration,
//! [`SessionError`] for the session document, and [`CommandError`] for the
//! CLI. [`Error`] unifies them for the binary.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-level result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for CLI commands.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent or orchestration failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Tool client failure.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Session persistence failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Command failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Failures of the literature tool client and the tool server adapter.
///
/// The `Display` text is what the tool server puts in the JSON-RPC error
/// `message` field, so it must stay human readable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// Malformed tool input. Never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Non-2xx response from the literature API.
    #[error("Upstream error: HTTP {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// Network failure reaching the literature API.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Tool name not present in the catalog.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Upstream {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

/// Errors raised by agents, providers and the orchestration layer.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key configured for the model provider.
    #[error("API key missing: set OPENAI_API_KEY or PUBTATOR_API_KEY")]
    ApiKeyMissing,

    /// Provider name not recognised by the factory.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name requested in configuration.
        name: String,
    },

    /// Model API request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error message from the SDK or transport.
        message: String,
        /// HTTP status if known.
        status: Option<u16>,
    },

    /// Model output could not be parsed into the expected shape.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// Parse error description.
        message: String,
        /// Raw model output.
        content: String,
    },

    /// A tool call failed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure message.
        message: String,
    },

    /// The model kept requesting tools beyond the iteration limit.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured limit.
        max_iterations: usize,
    },

    /// The tool server connection failed (spawn, I/O, protocol).
    #[error("tool server error: {message}")]
    ToolServer {
        /// Failure description.
        message: String,
    },

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration was invalid.
    #[error("configuration error: {message}")]
    Config {
        /// Failure description.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` for user-initiated cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors reading or writing the session document.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Filesystem failure.
    #[error("session I/O error at {path}: {source}")]
    Io {
        /// Session file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid session JSON.
    #[error("invalid session document at {path}: {source}")]
    Json {
        /// Session file path.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// CLI command failures.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command could not run to completion.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Writing command output failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}
