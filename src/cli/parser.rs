//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::agent::config::session_path_from_env;

/// pubtator-agents: biomedical literature assistant over PubTator3.
///
/// Classifies each question, translates it when needed, routes it to a
/// tool-using specialist, and optionally refines the answer with an LLM
/// judge.
#[derive(Parser, Debug)]
#[command(name = "pubtator-agents")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the session document.
    ///
    /// Defaults to `~/.pubtator-agents/session.json`.
    #[arg(short, long, env = "PUBTATOR_SESSION_PATH", global = true)]
    pub session: Option<PathBuf>,

    /// Directory with prompt overrides.
    #[arg(long, env = "PUBTATOR_PROMPT_DIR", global = true)]
    pub prompt_dir: Option<PathBuf>,

    /// Run the tool server inside this process instead of a child process.
    #[arg(long, global = true)]
    pub in_process: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute. Defaults to `chat`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive shell.
    #[command(after_help = r#"Shell commands:
  <question>            Research a question
  --judge <question>    Research with judge-driven refinement
  memory                Show the session document
  clear                 Delete the session and start fresh
  help                  Show this help
  exit                  Leave the shell
"#)]
    Chat,

    /// Answer one question and exit.
    #[command(after_help = r#"Examples:
  pubtator-agents ask "curcumin and inflammation"
  pubtator-agents ask "what is 34567890 about?"
  pubtator-agents ask --judge "lavanda para ansiedade"
"#)]
    Ask {
        /// The question.
        query: String,

        /// Refine the answer with the judge loop.
        #[arg(long)]
        judge: bool,
    },

    /// Run the literature tool server over stdio (JSON-RPC, one message per
    /// line).
    Tools,

    /// Write the default prompt files for editing.
    InitPrompts {
        /// Target directory (defaults to `~/.pubtator-agents/prompts`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Print the session document.
    Memory,

    /// Delete the session document.
    Clear,
}

impl Cli {
    /// Returns the session document path.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.session.clone().unwrap_or_else(session_path_from_env)
    }

    /// Returns the command to run.
    #[must_use]
    pub fn resolved_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }
}
