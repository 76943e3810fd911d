//! Stdio transport for the tool server.
//!
//! Provides the process entry point for `pubtator-agents tools` and the
//! command used by clients to start that process.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{BufReader, stdin, stdout};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::server::ToolServer;
use crate::error::ToolError;
use crate::pubtator::{PubTatorClient, PubTatorConfig};

/// How to start a tool server child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolServerCommand {
    /// Executable path.
    pub program: PathBuf,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
}

impl ToolServerCommand {
    /// The running binary's own `tools` subcommand.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the current executable path is unavailable.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: vec!["tools".to_string()],
        })
    }

    /// Resolves `PUBTATOR_TOOL_SERVER` (a whitespace-separated command line)
    /// or falls back to [`Self::current_exe`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the fallback cannot resolve the executable.
    pub fn from_env() -> std::io::Result<Self> {
        if let Ok(raw) = std::env::var("PUBTATOR_TOOL_SERVER") {
            let mut parts = raw.split_whitespace().map(str::to_string);
            if let Some(program) = parts.next() {
                return Ok(Self {
                    program: PathBuf::from(program),
                    args: parts.collect(),
                });
            }
        }
        Self::current_exe()
    }
}

/// Builds a tool server over a live PubTator client.
///
/// # Errors
///
/// Returns [`ToolError::Transport`] if the HTTP client cannot be built.
pub fn pubtator_server(config: &PubTatorConfig) -> Result<ToolServer, ToolError> {
    let client = PubTatorClient::new(config)?;
    Ok(ToolServer::new(Arc::new(client)))
}

/// Serves the tool protocol on this process's stdin/stdout.
///
/// stdout carries protocol lines only; logs go to stderr.
///
/// # Errors
///
/// Returns an error if the client cannot be built or stdio fails.
pub async fn serve_stdio(
    config: &PubTatorConfig,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let server = pubtator_server(config)?;
    info!(base_url = %config.base_url, "tool server listening on stdio");
    server
        .serve(BufReader::new(stdin()), stdout(), cancel)
        .await?;
    Ok(())
}
