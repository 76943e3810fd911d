//! Structured model outputs.
//!
//! A model asked for JSON may return it, return it inside a markdown fence,
//! or ignore the instruction. [`ModelOutput`] makes the two outcomes explicit
//! so every consumer has to handle the raw branch.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use super::message::ResponseSchema;

/// Either the parsed value or the raw text that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutput<T> {
    /// Output matched the expected shape.
    Parsed(T),
    /// Output did not parse; the original text is kept.
    Raw(String),
}

/// Strips a surrounding markdown code fence (with or without a language tag).
#[must_use]
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the info string ("json") on the opening line.
    let inner = match inner.split_once('\n') {
        Some((first, rest)) if !first.trim_start().starts_with('{') => rest,
        _ => inner,
    };
    inner.trim()
}

/// Parses model text into `T`.
///
/// Tries the fenced-stripped text first, then the outermost `{...}` span so
/// a short preamble before the JSON does not lose the answer.
pub fn parse_output<T: DeserializeOwned>(content: &str) -> ModelOutput<T> {
    let body = strip_code_fences(content);
    if let Ok(value) = serde_json::from_str::<T>(body) {
        return ModelOutput::Parsed(value);
    }
    if let (Some(start), Some(end)) = (body.find('{'), body.rfind('}'))
        && start < end
        && let Ok(value) = serde_json::from_str::<T>(&body[start..=end])
    {
        return ModelOutput::Parsed(value);
    }
    ModelOutput::Raw(content.to_string())
}

/// Generates the response schema sent to the provider for `T`.
#[must_use]
pub fn response_schema<T: JsonSchema>(name: &str) -> ResponseSchema {
    let schema = schemars::schema_for!(T);
    ResponseSchema {
        name: name.to_string(),
        schema: schema.to_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{QualityEvaluation, QualityScore};

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_output_fenced() {
        let out: ModelOutput<QualityEvaluation> = parse_output(
            "```json\n{\"score\":\"pass\",\"feedback\":\"ok\",\"suggestions\":[]}\n```",
        );
        let ModelOutput::Parsed(eval) = out else {
            unreachable!("fenced JSON should parse")
        };
        assert_eq!(eval.score, QualityScore::Pass);
    }

    #[test]
    fn test_parse_output_with_preamble() {
        let out: ModelOutput<QualityEvaluation> =
            parse_output("Here you go: {\"score\":\"fail\",\"feedback\":\"thin\"}");
        assert!(matches!(out, ModelOutput::Parsed(_)));
    }

    #[test]
    fn test_parse_output_raw_fallback_keeps_text() {
        let out: ModelOutput<QualityEvaluation> = parse_output("looks good to me");
        assert_eq!(out, ModelOutput::Raw("looks good to me".to_string()));
    }

    #[test]
    fn test_response_schema_describes_fields() {
        let schema = response_schema::<QualityEvaluation>("quality_evaluation");
        assert_eq!(schema.name, "quality_evaluation");
        let text = schema.schema.to_string();
        assert!(text.contains("score"));
        assert!(text.contains("needs_improvement"));
    }
}
