//! System prompts and template builders for agents.
//!
//! Prompts define each agent's behavior. Template builders format user
//! messages for the judge, the retry query and the front desk.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::core::QualityEvaluation;

/// System prompt for the language detection call.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You detect the language of a user's biomedical question.

Return only a JSON object:
{"language": "<English name of the language>", "isEnglish": <true|false>}

Rules:
- Judge by the words around any biomedical terms. Latin drug or species names alone do not make a query non-English.
- A query made only of identifiers or numbers is English.
- Never add commentary."#;

/// System prompt for the translator.
pub const TRANSLATOR_SYSTEM_PROMPT: &str = r#"You translate biomedical questions into English search terms.

Output only the biomedical terms of the question, translated to English and separated by commas. No sentences, no explanations, no quotes.

Rules:
- Prefer the common English name over a Latin binomial (lavender, not Lavandula angustifolia).
- Keep gene symbols, drug names and identifiers unchanged.
- Drop question words and filler.

Example: "lavanda para ansiedade" -> lavender, anxiety"#;

/// System prompt for the identifier-detail specialist.
pub const IDENTIFIER_SPECIALIST_SYSTEM_PROMPT: &str = r"You retrieve the details of one publication identified by its PubMed ID.

## Procedure

1. Call get_paper_text with the PMID first.
2. If that fails or returns no text, call search_pubtator with the PMID as the query.
3. Report what the publication says. Do not interpret, speculate or add outside knowledge.

## Output

- **Title**
- **Authors** (if available)
- **Abstract**
- **Key passages** (quoted, at most five)
- **Source**: PMID and, if known, PMC ID

If neither tool returns anything, say the publication could not be retrieved.";

/// System prompt for the general-search specialist.
pub const GENERAL_SEARCH_SPECIALIST_SYSTEM_PROMPT: &str = r"You answer biomedical literature questions using PubTator.

## Procedure

1. Resolve every biomedical concept in the question with find_entity before any search. Use the common English name.
2. Search with search_pubtator, joining resolved identifiers with AND:
   @CHEMICAL_Lavender AND @DISEASE_Anxiety
   Identifier queries support only a flat AND chain. Never use parentheses, OR or NOT with identifiers.
3. If identifier search returns nothing useful, fall back to a free-text query. Free text supports AND, OR, NOT and parentheses:
   lavender AND (anxiety OR stress)
4. Use get_paper_text for the most relevant results when abstracts are needed, and find_related_entities to explore relations.

## Output

Synthesize the findings in clear prose. Cite every claim with its PMID in brackets, e.g. [PMID 12345678]. Say plainly when the evidence is thin or absent. Never invent identifiers.";

/// System prompt for the judge.
pub const JUDGE_SYSTEM_PROMPT: &str = r#"You evaluate answers from a biomedical literature assistant.

Score the answer against the user's original question:
- "pass": answers the question, cites sources, no obvious gaps.
- "needs_improvement": partly answers, misses concepts, citations or important findings.
- "fail": does not answer, is off-topic, or reports no results when results are likely.

Return only JSON:
{"score": "pass" | "needs_improvement" | "fail", "feedback": "<one paragraph>", "suggestions": ["<concrete change>", ...]}

Suggestions must be actionable for a retry: concepts to resolve, search terms to try, papers to read."#;

/// System prompt for the front desk presenter.
pub const FRONT_DESK_SYSTEM_PROMPT: &str = r"You are the front desk of a biomedical literature assistant.

A specialist has already researched the user's question. Present the specialist's answer to the user in the requested language.

Rules:
- Translate faithfully. Do not add, remove or reinterpret findings.
- Keep every citation and identifier exactly as written.
- Keep the structure (headings, lists) of the original.";

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".pubtator-agents/prompts";

const CLASSIFIER_FILENAME: &str = "classifier.md";
const TRANSLATOR_FILENAME: &str = "translator.md";
const IDENTIFIER_SPECIALIST_FILENAME: &str = "identifier_specialist.md";
const GENERAL_SEARCH_SPECIALIST_FILENAME: &str = "general_search_specialist.md";
const JUDGE_FILENAME: &str = "judge.md";
const FRONT_DESK_FILENAME: &str = "front_desk.md";

/// Opening marker of the feedback block appended to retry queries.
pub const FEEDBACK_BLOCK_START: &str = "--- REVIEWER FEEDBACK ---";
/// Closing marker of the feedback block.
pub const FEEDBACK_BLOCK_END: &str = "--- END REVIEWER FEEDBACK ---";

/// Loaded system prompts for every agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// Language detection prompt.
    pub classifier: String,
    /// Translation prompt.
    pub translator: String,
    /// Identifier-detail specialist prompt.
    pub identifier_specialist: String,
    /// General-search specialist prompt.
    pub general_search_specialist: String,
    /// Judge prompt.
    pub judge: String,
    /// Front desk prompt.
    pub front_desk: String,
}

impl PromptSet {
    /// Loads prompts from `prompt_dir`, then `PUBTATOR_PROMPT_DIR`, then the
    /// default directory. Missing files fall back to compiled-in defaults.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("PUBTATOR_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            classifier: load_file(CLASSIFIER_FILENAME, CLASSIFIER_SYSTEM_PROMPT),
            translator: load_file(TRANSLATOR_FILENAME, TRANSLATOR_SYSTEM_PROMPT),
            identifier_specialist: load_file(
                IDENTIFIER_SPECIALIST_FILENAME,
                IDENTIFIER_SPECIALIST_SYSTEM_PROMPT,
            ),
            general_search_specialist: load_file(
                GENERAL_SEARCH_SPECIALIST_FILENAME,
                GENERAL_SEARCH_SPECIALIST_SYSTEM_PROMPT,
            ),
            judge: load_file(JUDGE_FILENAME, JUDGE_SYSTEM_PROMPT),
            front_desk: load_file(FRONT_DESK_FILENAME, FRONT_DESK_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            classifier: CLASSIFIER_SYSTEM_PROMPT.to_string(),
            translator: TRANSLATOR_SYSTEM_PROMPT.to_string(),
            identifier_specialist: IDENTIFIER_SPECIALIST_SYSTEM_PROMPT.to_string(),
            general_search_specialist: GENERAL_SEARCH_SPECIALIST_SYSTEM_PROMPT.to_string(),
            judge: JUDGE_SYSTEM_PROMPT.to_string(),
            front_desk: FRONT_DESK_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (CLASSIFIER_FILENAME, CLASSIFIER_SYSTEM_PROMPT),
            (TRANSLATOR_FILENAME, TRANSLATOR_SYSTEM_PROMPT),
            (IDENTIFIER_SPECIALIST_FILENAME, IDENTIFIER_SPECIALIST_SYSTEM_PROMPT),
            (
                GENERAL_SEARCH_SPECIALIST_FILENAME,
                GENERAL_SEARCH_SPECIALIST_SYSTEM_PROMPT,
            ),
            (JUDGE_FILENAME, JUDGE_SYSTEM_PROMPT),
            (FRONT_DESK_FILENAME, FRONT_DESK_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the identifier specialist's user message.
#[must_use]
pub fn build_identifier_prompt(query: &str, pmid: Option<&str>) -> String {
    match pmid {
        Some(pmid) => format!("PMID: {pmid}\n\nRequest: {query}"),
        None => query.to_string(),
    }
}

/// Builds the judge's user message.
#[must_use]
pub fn build_judge_prompt(original_query: &str, answer: &str) -> String {
    format!("## Original question\n\n{original_query}\n\n## Answer to evaluate\n\n{answer}")
}

/// Appends the judge's feedback to the original query for a retry.
///
/// The block is delimited so the specialist can tell the user's question
/// from reviewer notes. Each suggestion gets its own line.
#[must_use]
pub fn build_retry_query(original_query: &str, evaluation: &QualityEvaluation) -> String {
    let mut query = String::with_capacity(original_query.len() + 256);
    query.push_str(original_query);
    query.push_str("\n\n");
    query.push_str(FEEDBACK_BLOCK_START);
    let _ = write!(query, "\nFeedback: {}", evaluation.feedback.trim());
    if !evaluation.suggestions.is_empty() {
        query.push_str("\nSuggestions:");
        for suggestion in &evaluation.suggestions {
            let _ = write!(query, "\n- {}", suggestion.trim());
        }
    }
    query.push('\n');
    query.push_str(FEEDBACK_BLOCK_END);
    query
}

/// Builds the front desk's user message.
#[must_use]
pub fn build_front_desk_prompt(answer: &str, language: &str) -> String {
    format!("Target language: {language}\n\n## Specialist answer\n\n{answer}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::QualityScore;

    #[test]
    fn test_build_retry_query_delimits_feedback() {
        let eval = QualityEvaluation {
            score: QualityScore::Fail,
            feedback: "No citations.".to_string(),
            suggestions: vec!["Resolve lavender".to_string(), "Cite PMIDs".to_string()],
        };
        let query = build_retry_query("lavender, anxiety", &eval);
        assert!(query.starts_with("lavender, anxiety\n\n"));
        assert!(query.contains(FEEDBACK_BLOCK_START));
        assert!(query.ends_with(FEEDBACK_BLOCK_END));
        assert!(query.contains("\n- Resolve lavender\n"));
        assert!(query.contains("\n- Cite PMIDs\n"));
        assert!(query.contains("Feedback: No citations."));
    }

    #[test]
    fn test_build_retry_query_without_suggestions() {
        let eval = QualityEvaluation {
            score: QualityScore::NeedsImprovement,
            feedback: "Thin.".to_string(),
            suggestions: Vec::new(),
        };
        let query = build_retry_query("q", &eval);
        assert!(!query.contains("Suggestions:"));
    }

    #[test]
    fn test_build_identifier_prompt() {
        assert_eq!(
            build_identifier_prompt("details of 12345678", Some("12345678")),
            "PMID: 12345678\n\nRequest: details of 12345678"
        );
        assert_eq!(build_identifier_prompt("q", None), "q");
    }

    #[test]
    fn test_prompts_not_empty() {
        let set = PromptSet::defaults();
        assert!(set.classifier.contains("isEnglish"));
        assert!(set.general_search_specialist.contains("find_entity"));
        assert!(set.identifier_specialist.contains("get_paper_text"));
        assert!(set.judge.contains("needs_improvement"));
    }

    #[test]
    fn test_load_overrides_single_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        std::fs::write(dir.path().join(JUDGE_FILENAME), "custom judge")
            .unwrap_or_else(|_| unreachable!());
        let set = PromptSet::load(Some(dir.path()));
        assert_eq!(set.judge, "custom judge");
        assert_eq!(set.translator, TRANSLATOR_SYSTEM_PROMPT);
    }

    #[test]
    fn test_write_defaults_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        std::fs::write(dir.path().join(JUDGE_FILENAME), "keep me")
            .unwrap_or_else(|_| unreachable!());
        let written = PromptSet::write_defaults(dir.path()).unwrap_or_default();
        assert_eq!(written.len(), 5);
        let judge = std::fs::read_to_string(dir.path().join(JUDGE_FILENAME)).unwrap_or_default();
        assert_eq!(judge, "keep me");
    }
}
