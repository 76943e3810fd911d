//! PubTator3 literature API access.
//!
//! [`LiteratureApi`] is the seam between the tool server and the network:
//! [`PubTatorClient`] implements it over rate-limited HTTP, tests implement
//! it with canned data.

pub mod bioc;
pub mod client;
pub mod query;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

pub use client::{PubTatorClient, PubTatorConfig};
pub use query::{SearchQuery, is_entity_id, validate_search_query};

/// Export format for `get_paper_text`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    /// PubTator tab-delimited annotations.
    Pubtator,
    /// BioC XML.
    Biocxml,
    /// BioC JSON, flattened to passage text by the client.
    #[default]
    Biocjson,
}

impl TextFormat {
    /// Returns the path segment used by the export endpoint.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pubtator => "pubtator",
            Self::Biocxml => "biocxml",
            Self::Biocjson => "biocjson",
        }
    }
}

/// The four literature operations exposed as tools.
#[async_trait]
pub trait LiteratureApi: Send + Sync {
    /// Resolves free text to standardized entity identifiers.
    async fn find_entity(
        &self,
        query: &str,
        concept: Option<&str>,
        limit: usize,
    ) -> Result<Value, ToolError>;

    /// Searches publications by free text, entity identifiers or relations.
    async fn search(&self, query: &str, limit: usize) -> Result<Value, ToolError>;

    /// Retrieves publication text by PMID or PMC ID (exactly one kind).
    async fn get_text(
        &self,
        pmids: &[String],
        pmcids: &[String],
        format: TextFormat,
        full: bool,
    ) -> Result<Value, ToolError>;

    /// Lists entities related to `entity_id`.
    async fn find_related(
        &self,
        entity_id: &str,
        relation_type: Option<&str>,
        target_type: Option<&str>,
    ) -> Result<Value, ToolError>;
}
