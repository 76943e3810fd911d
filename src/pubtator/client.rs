//! Rate-limited HTTP client for the PubTator3 API.
//!
//! Every operation waits for one token from a shared limiter, then issues
//! exactly one HTTP GET. There are no retries at this layer; callers decide
//! whether a failed lookup is worth trying another way.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::Value;
use tracing::debug;

use super::bioc::flatten_body;
use super::query::validate_search_query;
use super::{LiteratureApi, TextFormat};
use crate::error::ToolError;

/// Default PubTator3 API root.
pub const DEFAULT_BASE_URL: &str = "https://www.ncbi.nlm.nih.gov/research/pubtator3-api";
/// Default request ceiling (requests per second).
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 3;
/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Upstream error bodies are truncated to this many characters.
const MAX_ERROR_BODY: usize = 300;

/// Connection settings for [`PubTatorClient`].
#[derive(Debug, Clone)]
pub struct PubTatorConfig {
    /// API root without trailing slash.
    pub base_url: String,
    /// Token refill rate of the limiter.
    pub requests_per_second: NonZeroU32,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for PubTatorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_second: NonZeroU32::new(DEFAULT_REQUESTS_PER_SECOND)
                .unwrap_or(NonZeroU32::MIN),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl PubTatorConfig {
    /// Reads `PUBTATOR_API_URL`, `PUBTATOR_RATE_LIMIT` and
    /// `PUBTATOR_HTTP_TIMEOUT_SECS`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("PUBTATOR_API_URL") {
            config.base_url = url;
        }
        if let Some(rps) = std::env::var("PUBTATOR_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .and_then(NonZeroU32::new)
        {
            config.requests_per_second = rps;
        }
        if let Some(secs) = std::env::var("PUBTATOR_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    /// Sets the API root.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request ceiling.
    #[must_use]
    pub const fn with_requests_per_second(mut self, rps: NonZeroU32) -> Self {
        self.requests_per_second = rps;
        self
    }

    /// Limiter quota: burst of one, refilled every `ceil(1000 / rps)` ms so
    /// the configured ceiling is never exceeded.
    fn quota(&self) -> Quota {
        let period_ms = 1000_u64.div_ceil(u64::from(self.requests_per_second.get()));
        Quota::with_period(Duration::from_millis(period_ms.max(1)))
            .unwrap_or_else(|| Quota::per_second(self.requests_per_second))
    }
}

/// PubTator3 client with a token-bucket limiter.
pub struct PubTatorClient {
    http: reqwest::Client,
    limiter: DefaultDirectRateLimiter,
    base_url: String,
}

impl std::fmt::Debug for PubTatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubTatorClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PubTatorClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &PubTatorConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("pubtator-agents/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            limiter: RateLimiter::direct(config.quota()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Waits until the limiter grants a token.
    async fn acquire(&self) {
        if self.limiter.check().is_err() {
            debug!("rate limit reached, waiting for token");
            self.limiter.until_ready().await;
        }
    }

    /// Issues one rate-limited GET and returns the response body.
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<String, ToolError> {
        self.acquire().await;

        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, ?params, "pubtator request");

        let response = self.http.get(&url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message: String = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.chars().take(MAX_ERROR_BODY).collect()
            };
            return Err(ToolError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ToolError> {
        let body = self.get(path, params).await?;
        serde_json::from_str(&body)
            .map_err(|e| ToolError::Transport(format!("invalid JSON from {path}: {e}")))
    }
}

#[async_trait]
impl LiteratureApi for PubTatorClient {
    async fn find_entity(
        &self,
        query: &str,
        concept: Option<&str>,
        limit: usize,
    ) -> Result<Value, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }
        let mut params = vec![("query", query.to_string()), ("limit", limit.to_string())];
        if let Some(concept) = concept {
            params.push(("concept", concept.to_string()));
        }
        self.get_json("/entity/autocomplete/", &params).await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Value, ToolError> {
        validate_search_query(query)?;
        let params = [("text", query.to_string()), ("page", "1".to_string())];
        let mut value = self.get_json("/search/", &params).await?;
        if let Some(results) = value.get_mut("results").and_then(Value::as_array_mut) {
            results.truncate(limit);
        }
        Ok(value)
    }

    async fn get_text(
        &self,
        pmids: &[String],
        pmcids: &[String],
        format: TextFormat,
        full: bool,
    ) -> Result<Value, ToolError> {
        let (key, ids) = match (pmids.is_empty(), pmcids.is_empty()) {
            (false, true) => ("pmids", pmids),
            (true, false) => ("pmcids", pmcids),
            (true, true) => {
                return Err(ToolError::InvalidArgument(
                    "one of pmids or pmcids is required".to_string(),
                ));
            }
            (false, false) => {
                return Err(ToolError::InvalidArgument(
                    "pass either pmids or pmcids, not both".to_string(),
                ));
            }
        };

        let mut params = vec![(key, ids.join(","))];
        if full {
            params.push(("full", "true".to_string()));
        }
        let path = format!("/publications/export/{}", format.as_str());
        let body = self.get(&path, &params).await?;

        let text = match format {
            TextFormat::Biocjson => flatten_body(&body),
            TextFormat::Pubtator | TextFormat::Biocxml => body,
        };
        Ok(Value::String(text))
    }

    async fn find_related(
        &self,
        entity_id: &str,
        relation_type: Option<&str>,
        target_type: Option<&str>,
    ) -> Result<Value, ToolError> {
        if entity_id.trim().is_empty() {
            return Err(ToolError::InvalidArgument(
                "entityId must not be empty".to_string(),
            ));
        }
        let mut params = vec![("e1", entity_id.to_string())];
        if let Some(kind) = relation_type {
            params.push(("type", kind.to_string()));
        }
        if let Some(target) = target_type {
            params.push(("e2", target.to_string()));
        }
        self.get_json("/relations", &params).await
    }
}
