//! Interactive shell.
//!
//! Reads one line at a time. Each question runs under its own child
//! cancellation token; Ctrl-C cancels the running question and the shell
//! keeps going.

use std::future::Future;
use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agent::{JudgeLoop, Orchestrator};
use crate::error::{AgentError, CommandError};
use crate::session::{SessionState, SessionStore};

const HELP: &str = "Commands:
  <question>            research a question
  --judge <question>    research with judge-driven refinement
  memory                show the session document
  clear                 delete the session and start fresh
  help                  show this help
  exit                  leave the shell";

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Blank line.
    Empty,
    /// Research a question.
    Ask(String),
    /// Research with the judge loop.
    Judge(String),
    /// Print the session document.
    Memory,
    /// Delete the session document.
    Clear,
    /// Print help.
    Help,
    /// Leave the shell.
    Exit,
}

impl ShellCommand {
    /// Parses one input line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("--judge") {
            let query = rest.trim();
            // `--judgement` is a question, not the flag.
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return if query.is_empty() {
                    Self::Help
                } else {
                    Self::Judge(query.to_string())
                };
            }
        }
        match line.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "memory" => Self::Memory,
            "clear" => Self::Clear,
            "help" | "?" => Self::Help,
            "exit" | "quit" => Self::Exit,
            _ => Self::Ask(line.to_string()),
        }
    }
}

/// Runs `fut`, cancelling `token` on Ctrl-C until `fut` completes.
async fn interruptible<F: Future>(token: &CancellationToken, fut: F) -> F::Output {
    tokio::pin!(fut);
    loop {
        tokio::select! {
            out = &mut fut => return out,
            _ = tokio::signal::ctrl_c(), if !token.is_cancelled() => token.cancel(),
        }
    }
}

/// Interactive loop over `input`, writing answers to `out`.
///
/// # Errors
///
/// Returns [`CommandError::Output`] if reading input or writing output
/// fails.
pub async fn run_shell<R, W>(
    orchestrator: &Orchestrator,
    store: &SessionStore,
    mut session: SessionState,
    input: R,
    out: &mut W,
) -> Result<(), CommandError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let root = CancellationToken::new();
    let mut lines = input.lines();

    writeln!(
        out,
        "pubtator-agents (session {}, {} interactions). Type 'help' for commands.",
        session.conversation_id, session.total_interactions
    )?;

    loop {
        write!(out, "> ")?;
        out.flush()?;
        // Ctrl-C at the prompt leaves the shell.
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            writeln!(out)?;
            break;
        };

        match ShellCommand::parse(&line) {
            ShellCommand::Empty => {}
            ShellCommand::Exit => break,
            ShellCommand::Help => writeln!(out, "{HELP}")?,
            ShellCommand::Memory => {
                let doc = serde_json::to_string_pretty(&session)
                    .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;
                writeln!(out, "{doc}")?;
            }
            ShellCommand::Clear => {
                if let Err(e) = store.clear() {
                    warn!(error = %e, "session clear failed");
                }
                session = SessionState::new();
                writeln!(out, "Session cleared.")?;
            }
            ShellCommand::Ask(query) => {
                let token = root.child_token();
                let result = interruptible(
                    &token,
                    orchestrator.ask(store, session.clone(), &query, &token),
                )
                .await;
                match result {
                    Ok(outcome) => {
                        writeln!(out, "\n{}\n", outcome.result)?;
                        session = outcome.session;
                    }
                    Err(e) => {
                        if e.is_cancelled() {
                            session = session_after_cancel(store, session);
                        }
                        report(out, &e)?;
                    }
                }
            }
            ShellCommand::Judge(query) => {
                let token = root.child_token();
                let judge = JudgeLoop::new(orchestrator);
                let result =
                    interruptible(&token, judge.run(store, session.clone(), &query, &token)).await;
                match result {
                    Ok(outcome) => {
                        writeln!(out, "\n{}\n", outcome.final_result)?;
                        writeln!(
                            out,
                            "[judge: {:?} after {}/{} attempts]",
                            outcome.outcome,
                            outcome.attempts_used,
                            judge.max_attempts()
                        )?;
                        session = outcome.session;
                    }
                    Err(e) => {
                        // Attempts finished before the cancel are already on disk.
                        if e.is_cancelled() {
                            session = session_after_cancel(store, session);
                        }
                        report(out, &e)?;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Session to continue with after a cancelled run: the saved document if
/// there is one, else `current`.
fn session_after_cancel(store: &SessionStore, current: SessionState) -> SessionState {
    if !store.exists() {
        return current;
    }
    match store.load() {
        Ok(saved) if saved.conversation_id == current.conversation_id => saved,
        Ok(_) => current,
        Err(e) => {
            warn!(error = %e, "session reload after cancel failed");
            current
        }
    }
}

fn report<W: Write>(out: &mut W, err: &AgentError) -> Result<(), CommandError> {
    if err.is_cancelled() {
        writeln!(out, "Cancelled.")?;
    } else {
        writeln!(out, "Error: {err}")?;
    }
    Ok(())
}
