//! Multi-agent research pipeline.
//!
//! Routes a biomedical question through a guardrail classifier, an optional
//! translator, one of two tool-using specialists and an optional front desk,
//! with an LLM judge loop on top. Uses a pluggable provider abstraction
//! backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! User query → JudgeLoop (optional)
//!   └── Orchestrator::research
//!       ├── ClassifierAgent (local routing + language detection)
//!       ├── TranslatorAgent (only for non-English queries)
//!       ├── SpecialistAgent (identifier details | general search)
//!       │   └── agentic loop → ToolExecutor → ToolBackend
//!       └── FrontDeskAgent (answer in the user's language)
//! ```

pub mod agentic_loop;
pub mod cancel;
pub mod classifier;
pub mod client;
pub mod config;
pub mod executor;
pub mod front_desk;
pub mod judge;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod specialist;
pub mod structured;
pub mod tool;
pub mod traits;
pub mod translator;

// Re-export key types
pub use classifier::{ClassifierAgent, LanguageDetection};
pub use client::create_provider;
pub use config::AgentConfig;
pub use executor::{ToolExecutor, ToolPolicy};
pub use front_desk::FrontDeskAgent;
pub use judge::{JudgeAgent, JudgeLoop, JudgeLoopResult, JudgeOutcome};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{NO_RESULTS, Orchestrator, ResearchOutcome};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use specialist::{SpecialistAgent, SpecialistKind, SpecialistRun};
pub use structured::ModelOutput;
pub use tool::{ToolBackend, ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, execute_with_tools};
pub use translator::TranslatorAgent;
