//! Static catalog of the literature tools.
//!
//! The same definitions are advertised by `tools/list` and handed to the
//! specialists for function calling, so argument names, enums and defaults
//! stay in one place.

use serde_json::{Value, json};

use super::params::{DEFAULT_ENTITY_LIMIT, DEFAULT_SEARCH_LIMIT};
use crate::agent::tool::ToolDefinition;

/// Tool name for entity resolution.
pub const FIND_ENTITY: &str = "find_entity";
/// Tool name for literature search.
pub const SEARCH_PUBTATOR: &str = "search_pubtator";
/// Tool name for publication text retrieval.
pub const GET_PAPER_TEXT: &str = "get_paper_text";
/// Tool name for relation lookup.
pub const FIND_RELATED_ENTITIES: &str = "find_related_entities";

/// Concept types accepted by `find_entity`.
pub const CONCEPT_TYPES: &[&str] = &[
    "gene",
    "disease",
    "chemical",
    "species",
    "variant",
    "cell_line",
];

/// Relation types accepted by `find_related_entities`.
pub const RELATION_TYPES: &[&str] = &[
    "treat",
    "cause",
    "cotreat",
    "convert",
    "compare",
    "interact",
    "associate",
    "positive_correlate",
    "negative_correlate",
    "prevent",
    "inhibit",
    "stimulate",
    "drug_interact",
];

/// Target entity types accepted by `find_related_entities`.
pub const TARGET_TYPES: &[&str] = &["gene", "disease", "chemical", "variant"];

/// Returns all four tool definitions in catalog order.
#[must_use]
pub fn tool_catalog() -> Vec<ToolDefinition> {
    vec![
        def_find_entity(),
        def_search_pubtator(),
        def_get_paper_text(),
        def_find_related_entities(),
    ]
}

/// Renders the catalog as a `tools/list` result payload.
#[must_use]
pub fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_catalog()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.parameters,
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn def_find_entity() -> ToolDefinition {
    ToolDefinition {
        name: FIND_ENTITY.to_string(),
        description: "Resolve a biomedical concept written in free text to standardized PubTator \
                      entity identifiers (e.g. \"lavender\" -> @CHEMICAL_Lavender). Always call \
                      this before searching by concept."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Concept name in English, common name preferred."
                },
                "concept": {
                    "type": "string",
                    "enum": CONCEPT_TYPES,
                    "description": "Restrict results to one concept type."
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "default": DEFAULT_ENTITY_LIMIT,
                    "description": "Maximum number of candidate identifiers."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

fn def_search_pubtator() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_PUBTATOR.to_string(),
        description: "Search PubTator publications. Entity-identifier queries support only a \
                      flat AND chain (@CHEMICAL_X AND @DISEASE_Y), never parentheses. Free-text \
                      queries support AND, OR, NOT and parenthesised grouping."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Entity-identifier conjunction or free-text boolean query."
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "default": DEFAULT_SEARCH_LIMIT,
                    "description": "Maximum number of publications to return."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

fn def_get_paper_text() -> ToolDefinition {
    ToolDefinition {
        name: GET_PAPER_TEXT.to_string(),
        description: "Retrieve publication text by PubMed ID or PMC ID. Provide exactly one of \
                      pmids or pmcids. The biocjson format returns all passages as plain text."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "pmids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "PubMed identifiers (7-9 digits)."
                },
                "pmcids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "PubMed Central identifiers (e.g. PMC7096066)."
                },
                "format": {
                    "type": "string",
                    "enum": ["pubtator", "biocxml", "biocjson"],
                    "default": "biocjson",
                    "description": "Export format."
                },
                "full": {
                    "type": "boolean",
                    "default": false,
                    "description": "Request full text instead of title and abstract."
                }
            },
            "additionalProperties": false,
            "minProperties": 1
        }),
    }
}

fn def_find_related_entities() -> ToolDefinition {
    ToolDefinition {
        name: FIND_RELATED_ENTITIES.to_string(),
        description: "List entities related to an entity identifier, optionally filtered by \
                      relation type and target entity type."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "entityId": {
                    "type": "string",
                    "description": "Source entity identifier from find_entity."
                },
                "relationType": {
                    "type": "string",
                    "enum": RELATION_TYPES,
                    "description": "Relation type filter."
                },
                "targetType": {
                    "type": "string",
                    "enum": TARGET_TYPES,
                    "description": "Target entity type filter."
                }
            },
            "required": ["entityId"],
            "additionalProperties": false
        }),
    }
}
