//! # pubtator-agents
//!
//! Multi-agent biomedical literature assistant over the PubTator3 API.
//!
//! A question goes through a guardrail classifier, an optional translator,
//! one of two tool-using specialists, and optionally an LLM judge loop that
//! retries with the judge's feedback. The specialists reach the literature
//! API through a line-delimited JSON-RPC tool server that rate-limits every
//! outbound call.
//!
//! ## Modules
//!
//! - [`core`]: classification and evaluation value types
//! - [`pubtator`]: rate-limited literature API client
//! - [`mcp`]: tool server adapter and its stdio client
//! - [`agent`]: providers, specialists, orchestrator and judge loop
//! - [`session`]: session document store
//! - [`cli`]: command-line interface

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod mcp;
pub mod pubtator;
pub mod session;

pub use agent::{
    AgentConfig, JudgeLoop, JudgeLoopResult, JudgeOutcome, Orchestrator, ResearchOutcome,
};
pub use core::{QualityEvaluation, QualityScore, QueryClassification, QueryType};
pub use error::{AgentError, Error, Result, SessionError, ToolError};
pub use session::{SessionState, SessionStore};
