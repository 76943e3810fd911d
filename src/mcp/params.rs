//! Argument types for the four literature tools.
//!
//! Field names follow the wire catalog (`entityId`, `relationType`, ...);
//! snake_case aliases are accepted because models emit both. Defaults match
//! the catalog's advertised defaults.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::pubtator::TextFormat;

/// Default `limit` for `find_entity`.
pub const DEFAULT_ENTITY_LIMIT: usize = 5;
/// Default `limit` for `search_pubtator`.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

const fn default_entity_limit() -> usize {
    DEFAULT_ENTITY_LIMIT
}

const fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// Arguments for `find_entity`.
#[derive(Debug, Clone, Deserialize)]
pub struct FindEntityParams {
    /// Free text to resolve (e.g. "lavender").
    pub query: String,
    /// Restrict to one concept type.
    #[serde(default)]
    pub concept: Option<String>,
    /// Maximum number of candidates.
    #[serde(default = "default_entity_limit")]
    pub limit: usize,
}

/// Arguments for `search_pubtator`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    /// Free text, entity-identifier or relation query.
    pub query: String,
    /// Maximum number of results.
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

/// Arguments for `get_paper_text`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetTextParams {
    /// PubMed identifiers.
    #[serde(default, deserialize_with = "id_list")]
    pub pmids: Vec<String>,
    /// PubMed Central identifiers.
    #[serde(default, deserialize_with = "id_list")]
    pub pmcids: Vec<String>,
    /// Export format.
    #[serde(default)]
    pub format: TextFormat,
    /// Request full text where available.
    #[serde(default)]
    pub full: bool,
}

/// Arguments for `find_related_entities`.
#[derive(Debug, Clone, Deserialize)]
pub struct FindRelatedParams {
    /// Source entity identifier (e.g. `@CHEMICAL_Curcumin`).
    #[serde(rename = "entityId", alias = "entity_id")]
    pub entity_id: String,
    /// Relation type filter (e.g. `treat`).
    #[serde(default, rename = "relationType", alias = "relation_type")]
    pub relation_type: Option<String>,
    /// Target entity type filter (e.g. `disease`).
    #[serde(default, rename = "targetType", alias = "target_type")]
    pub target_type: Option<String>,
}

/// Accepts `["1", "2"]`, `[1, 2]`, `"1,2"` or `1`.
fn id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    let value = Value::deserialize(deserializer)?;
    let ids = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        Value::String(s) => s.split(',').map(|p| p.trim().to_string()).collect(),
        Value::Number(n) => vec![n.to_string()],
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a list of identifiers, got {other}"
            )));
        }
    };
    Ok(ids.into_iter().filter(|id| !id.is_empty()).collect())
}
