//! Flattening of BioC JSON exports.
//!
//! Callers of `get_paper_text` in `biocjson` format receive plain text: every
//! passage of every returned document, joined with newlines, in document
//! order. The export endpoint has returned several envelope shapes over
//! time, all of which are accepted here:
//!
//! - `{"PubTator3": [doc, ...]}`
//! - `{"documents": [doc, ...]}` (BioC collection)
//! - `[doc, ...]`
//! - a single `doc`

use serde_json::Value;

/// Extracts every passage text from a BioC JSON payload.
#[must_use]
pub fn flatten_passages(payload: &Value) -> String {
    let mut lines = Vec::new();
    for doc in documents(payload) {
        let Some(passages) = doc.get("passages").and_then(Value::as_array) else {
            continue;
        };
        lines.extend(
            passages
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
    }
    lines.join("\n")
}

/// Parses a response body that may hold one JSON value or one value per line.
#[must_use]
pub fn flatten_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return flatten_passages(&value);
    }
    body.lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .map(|value| flatten_passages(&value))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn documents(payload: &Value) -> Vec<&Value> {
    match payload {
        Value::Array(items) => items.iter().flat_map(documents).collect(),
        Value::Object(map) => {
            if let Some(inner) = map.get("PubTator3").or_else(|| map.get("documents")) {
                documents(inner)
            } else if map.contains_key("passages") {
                vec![payload]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}
