//! CLI command implementations.
//!
//! Each command returns its output as a string; the binary writes it to
//! stdout. The shell and the tool server write to stdout themselves and
//! return an empty string.

use std::fmt::Write as FmtWrite;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::client::create_provider;
use crate::agent::config::AgentConfig;
use crate::agent::prompt::PromptSet;
use crate::agent::tool::ToolBackend;
use crate::agent::{JudgeLoop, Orchestrator};
use crate::cli::parser::{Cli, Commands};
use crate::cli::shell::run_shell;
use crate::error::{CommandError, Result};
use crate::mcp::{ToolServerClient, ToolServerCommand, pubtator_server, serve_stdio};
use crate::pubtator::PubTatorConfig;
use crate::session::SessionStore;

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let store = SessionStore::new(cli.session_path());

    match cli.resolved_command() {
        Commands::Memory => cmd_memory(&store),
        Commands::Clear => cmd_clear(&store),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref()),
        Commands::Tools => cmd_tools(),
        Commands::Ask { query, judge } => cmd_ask(cli, &store, &query, judge),
        Commands::Chat => cmd_chat(cli, &store),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn cmd_memory(store: &SessionStore) -> Result<String> {
    let session = store.load()?;
    let mut doc = serde_json::to_string_pretty(&session)
        .map_err(|e| CommandError::ExecutionFailed(format!("JSON serialization failed: {e}")))?;
    doc.push('\n');
    Ok(doc)
}

fn cmd_clear(store: &SessionStore) -> Result<String> {
    store.clear()?;
    Ok(format!("Session cleared: {}\n", store.path().display()))
}

fn cmd_init_prompts(dir: Option<&Path>) -> Result<String> {
    let target_dir = dir
        .map(std::path::PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    if written.is_empty() {
        return Ok(format!(
            "All prompt templates already exist in: {}\n",
            target_dir.display()
        ));
    }

    let mut output = format!(
        "Wrote {} prompt template(s) to: {}\n",
        written.len(),
        target_dir.display()
    );
    for path in &written {
        let _ = writeln!(
            output,
            "  {}",
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
        );
    }
    output.push_str("\nEdit these files to customize agent system prompts.\n");
    Ok(output)
}

/// Serves the tool protocol on stdio until stdin closes or Ctrl-C.
fn cmd_tools() -> Result<String> {
    let config = PubTatorConfig::from_env();
    let rt = runtime()?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });
        serve_stdio(&config, &cancel).await
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("Tool server error: {e}")))?;

    Ok(String::new())
}

fn agent_config(cli: &Cli) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder()
        .from_env()
        .session_path(cli.session_path());
    if let Some(dir) = &cli.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

/// Creates the tool backend: in-process, or a child `tools` process.
async fn tool_backend(
    in_process: bool,
    cancel: &CancellationToken,
) -> Result<Arc<dyn ToolBackend>> {
    if in_process {
        let server = pubtator_server(&PubTatorConfig::from_env())?;
        debug!("using in-process tool server");
        return Ok(Arc::new(server));
    }
    let command = ToolServerCommand::from_env().map_err(|e| {
        CommandError::ExecutionFailed(format!("Cannot locate tool server: {e}"))
    })?;
    let client = ToolServerClient::spawn(&command, cancel).await?;
    Ok(Arc::new(client))
}

async fn orchestrator(cli: &Cli, cancel: &CancellationToken) -> Result<Orchestrator> {
    let config = agent_config(cli)?;
    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let backend = tool_backend(cli.in_process, cancel).await?;
    Ok(Orchestrator::new(provider, backend, config))
}

fn cmd_ask(cli: &Cli, store: &SessionStore, query: &str, judge: bool) -> Result<String> {
    let rt = runtime()?;

    rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });

        let orchestrator = orchestrator(cli, &cancel).await?;
        let session = store.load()?;

        if judge {
            let judge_loop = JudgeLoop::new(&orchestrator);
            let result = judge_loop.run(store, session, query, &cancel).await?;
            Ok(format!(
                "{}\n\n---\nJudge: {:?} after {}/{} attempts\n",
                result.final_result,
                result.outcome,
                result.attempts_used,
                judge_loop.max_attempts()
            ))
        } else {
            let outcome = orchestrator.ask(store, session, query, &cancel).await?;
            Ok(format!(
                "{}\n\n---\nSpecialist: {} | Language: {} | Query: {}\n",
                outcome.result,
                outcome.specialist,
                outcome.classification.detected_language,
                outcome.effective_query
            ))
        }
    })
}

fn cmd_chat(cli: &Cli, store: &SessionStore) -> Result<String> {
    let rt = runtime()?;

    rt.block_on(async {
        let startup = CancellationToken::new();
        let orchestrator = orchestrator(cli, &startup).await?;
        let session = store.load()?;
        let mut out = io::stdout();
        run_shell(
            &orchestrator,
            store,
            session,
            BufReader::new(tokio::io::stdin()),
            &mut out,
        )
        .await?;
        Ok(String::new())
    })
}
