//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default model for the cheap structured calls (classifier, translator).
const DEFAULT_FAST_MODEL: &str = "gpt-4o-mini";
/// Default model for specialists, judge and front desk.
const DEFAULT_REASONING_MODEL: &str = "gpt-4o";
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 12;
/// Default judge loop attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Default number of transcript messages kept in the session.
const DEFAULT_MAX_HISTORY: usize = 40;
/// Default specialist max tokens.
const DEFAULT_SPECIALIST_MAX_TOKENS: u32 = 4096;
/// Default max tokens for short structured calls.
const DEFAULT_STRUCTURED_MAX_TOKENS: u32 = 1024;

/// Session document location: `PUBTATOR_SESSION_PATH`, else
/// `~/.pubtator-agents/session.json`, else `./session.json`.
#[must_use]
pub fn session_path_from_env() -> PathBuf {
    std::env::var("PUBTATOR_SESSION_PATH").map_or_else(
        |_| {
            dirs::home_dir().map_or_else(
                || PathBuf::from("session.json"),
                |home| home.join(".pubtator-agents").join("session.json"),
            )
        },
        PathBuf::from,
    )
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for language detection.
    pub classifier_model: String,
    /// Model for query translation.
    pub translator_model: String,
    /// Model for both specialists.
    pub specialist_model: String,
    /// Model for quality evaluation.
    pub judge_model: String,
    /// Model for localized presentation.
    pub front_desk_model: String,
    /// Maximum tokens for specialist responses.
    pub specialist_max_tokens: u32,
    /// Maximum tokens for classifier, translator and judge responses.
    pub structured_max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum tool-calling loop iterations before aborting.
    pub max_tool_iterations: usize,
    /// Judge loop attempt budget (`MAX_ATTEMPTS`).
    pub max_attempts: usize,
    /// Transcript messages kept in the session document.
    pub max_history_messages: usize,
    /// Re-present answers in the user's language when it is not English.
    pub localize: bool,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for missing files.
    pub prompt_dir: Option<PathBuf>,
    /// Session document path.
    pub session_path: PathBuf,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    classifier_model: Option<String>,
    translator_model: Option<String>,
    specialist_model: Option<String>,
    judge_model: Option<String>,
    front_desk_model: Option<String>,
    specialist_max_tokens: Option<u32>,
    structured_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_tool_iterations: Option<usize>,
    max_attempts: Option<usize>,
    max_history_messages: Option<usize>,
    localize: Option<bool>,
    prompt_dir: Option<PathBuf>,
    session_path: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("PUBTATOR_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("PUBTATOR_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL").ok();
        }
        if self.classifier_model.is_none() {
            self.classifier_model = std::env::var("PUBTATOR_CLASSIFIER_MODEL").ok();
        }
        if self.translator_model.is_none() {
            self.translator_model = std::env::var("PUBTATOR_TRANSLATOR_MODEL").ok();
        }
        if self.specialist_model.is_none() {
            self.specialist_model = std::env::var("PUBTATOR_SPECIALIST_MODEL").ok();
        }
        if self.judge_model.is_none() {
            self.judge_model = std::env::var("PUBTATOR_JUDGE_MODEL").ok();
        }
        if self.front_desk_model.is_none() {
            self.front_desk_model = std::env::var("PUBTATOR_FRONT_DESK_MODEL").ok();
        }
        if self.max_attempts.is_none() {
            self.max_attempts = env_parse("PUBTATOR_MAX_ATTEMPTS");
        }
        if self.max_tool_iterations.is_none() {
            self.max_tool_iterations = env_parse("PUBTATOR_MAX_TOOL_ITERATIONS");
        }
        if self.max_history_messages.is_none() {
            self.max_history_messages = env_parse("PUBTATOR_MAX_HISTORY");
        }
        if self.localize.is_none() {
            self.localize = env_bool("PUBTATOR_LOCALIZE");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("PUBTATOR_PROMPT_DIR").ok().map(PathBuf::from);
        }
        if self.session_path.is_none() {
            self.session_path = Some(session_path_from_env());
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the language detection model.
    #[must_use]
    pub fn classifier_model(mut self, model: impl Into<String>) -> Self {
        self.classifier_model = Some(model.into());
        self
    }

    /// Sets the translation model.
    #[must_use]
    pub fn translator_model(mut self, model: impl Into<String>) -> Self {
        self.translator_model = Some(model.into());
        self
    }

    /// Sets the specialist model.
    #[must_use]
    pub fn specialist_model(mut self, model: impl Into<String>) -> Self {
        self.specialist_model = Some(model.into());
        self
    }

    /// Sets the judge model.
    #[must_use]
    pub fn judge_model(mut self, model: impl Into<String>) -> Self {
        self.judge_model = Some(model.into());
        self
    }

    /// Sets the front desk model.
    #[must_use]
    pub fn front_desk_model(mut self, model: impl Into<String>) -> Self {
        self.front_desk_model = Some(model.into());
        self
    }

    /// Sets the specialist max tokens.
    #[must_use]
    pub const fn specialist_max_tokens(mut self, n: u32) -> Self {
        self.specialist_max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the judge loop attempt budget.
    #[must_use]
    pub const fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Sets how many transcript messages the session keeps.
    #[must_use]
    pub const fn max_history_messages(mut self, n: usize) -> Self {
        self.max_history_messages = Some(n);
        self
    }

    /// Enables or disables localized presentation.
    #[must_use]
    pub const fn localize(mut self, enabled: bool) -> Self {
        self.localize = Some(enabled);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the session document path.
    #[must_use]
    pub fn session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set and
    /// [`AgentError::Config`] if the attempt budget is zero.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;
        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(AgentError::Config {
                message: "max_attempts must be at least 1".to_string(),
            });
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            classifier_model: self
                .classifier_model
                .unwrap_or_else(|| DEFAULT_FAST_MODEL.to_string()),
            translator_model: self
                .translator_model
                .unwrap_or_else(|| DEFAULT_FAST_MODEL.to_string()),
            specialist_model: self
                .specialist_model
                .unwrap_or_else(|| DEFAULT_REASONING_MODEL.to_string()),
            judge_model: self
                .judge_model
                .unwrap_or_else(|| DEFAULT_REASONING_MODEL.to_string()),
            front_desk_model: self
                .front_desk_model
                .unwrap_or_else(|| DEFAULT_FAST_MODEL.to_string()),
            specialist_max_tokens: self
                .specialist_max_tokens
                .unwrap_or(DEFAULT_SPECIALIST_MAX_TOKENS),
            structured_max_tokens: self
                .structured_max_tokens
                .unwrap_or(DEFAULT_STRUCTURED_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_tool_iterations: self
                .max_tool_iterations
                .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS),
            max_attempts,
            max_history_messages: self.max_history_messages.unwrap_or(DEFAULT_MAX_HISTORY),
            localize: self.localize.unwrap_or(true),
            prompt_dir: self.prompt_dir,
            session_path: self.session_path.unwrap_or_else(session_path_from_env),
        })
    }
}
