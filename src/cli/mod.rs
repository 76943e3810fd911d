//! CLI layer for pubtator-agents.
//!
//! Provides the command-line interface using clap: the interactive shell,
//! one-shot questions, the stdio tool server and session maintenance.

pub mod commands;
pub mod parser;
pub mod shell;

pub use commands::execute;
pub use parser::{Cli, Commands};
pub use shell::{ShellCommand, run_shell};
