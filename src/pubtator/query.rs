//! Search query construction for `search_pubtator`.
//!
//! PubTator3 search accepts two query dialects that look alike but are not
//! interchangeable:
//!
//! - entity-identifier queries (`@CHEMICAL_Curcumin AND @DISEASE_Inflammation`)
//!   which only support a flat chain of `AND`;
//! - free-text boolean queries (`curcumin AND (arthritis OR inflammation)`)
//!   which also support `OR`, `NOT` and parenthesised grouping.
//!
//! [`SearchQuery`] only builds queries the endpoint can execute, and
//! [`validate_search_query`] rejects hand-written entity-only queries that
//! use grouping or other operators.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ToolError;

static ENTITY_ID_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^@[A-Z]+_[A-Za-z0-9_\-.:]+$").ok());

/// Returns `true` if `token` is a PubTator entity identifier such as
/// `@DISEASE_Anxiety` or `@GENE_TP53`.
#[must_use]
pub fn is_entity_id(token: &str) -> bool {
    ENTITY_ID_RE.as_ref().is_some_and(|re| re.is_match(token))
}

fn is_operator(token: &str) -> bool {
    matches!(token, "AND" | "OR" | "NOT")
}

/// Checks a raw search query before it is sent to the API.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArgument`] if the query is empty, or if it
/// is composed purely of entity identifiers and uses parentheses or any
/// operator other than `AND`.
pub fn validate_search_query(query: &str) -> Result<(), ToolError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidArgument(
            "search query must not be empty".to_string(),
        ));
    }

    let tokens: Vec<&str> = trimmed
        .split_whitespace()
        .map(|t| t.trim_matches(|c| c == '(' || c == ')'))
        .filter(|t| !t.is_empty())
        .collect();

    let entity_only = tokens.iter().any(|t| is_entity_id(t))
        && tokens.iter().all(|t| is_entity_id(t) || is_operator(t));
    if !entity_only {
        return Ok(());
    }

    if trimmed.contains('(') || trimmed.contains(')') {
        return Err(ToolError::InvalidArgument(format!(
            "entity identifier queries do not support parentheses; use a flat AND chain: {trimmed}"
        )));
    }
    if let Some(op) = tokens.iter().find(|t| **t == "OR" || **t == "NOT") {
        return Err(ToolError::InvalidArgument(format!(
            "entity identifier queries only support AND, found {op}: {trimmed}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Entity(String),
    Text(String),
    AnyText(Vec<String>),
}

/// Builder for `search_pubtator` queries.
///
/// Clauses are joined with `AND`. Only free-text alternatives may be
/// grouped; a group containing an entity identifier is rejected at
/// [`SearchQuery::build`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    clauses: Vec<Clause>,
}

impl SearchQuery {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flat conjunction of entity identifiers.
    #[must_use]
    pub fn entities<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ids.into_iter().fold(Self::new(), |query, id| query.entity(id))
    }

    /// Adds a resolved entity identifier.
    #[must_use]
    pub fn entity(mut self, id: impl Into<String>) -> Self {
        self.clauses.push(Clause::Entity(id.into()));
        self
    }

    /// Adds a free-text term.
    #[must_use]
    pub fn text(mut self, term: impl Into<String>) -> Self {
        self.clauses.push(Clause::Text(term.into()));
        self
    }

    /// Adds a group of free-text alternatives joined with `OR`.
    #[must_use]
    pub fn any_of<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.clauses.push(Clause::AnyText(
            alternatives.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Returns `true` if every clause is an entity identifier.
    #[must_use]
    pub fn is_entity_only(&self) -> bool {
        !self.clauses.is_empty() && self.clauses.iter().all(|c| matches!(c, Clause::Entity(_)))
    }

    /// Renders the query string.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArgument`] for an empty query, a malformed
    /// entity identifier, an empty group, or a group containing an entity
    /// identifier.
    pub fn build(&self) -> Result<String, ToolError> {
        if self.clauses.is_empty() {
            return Err(ToolError::InvalidArgument(
                "search query must not be empty".to_string(),
            ));
        }

        let mut parts = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            match clause {
                Clause::Entity(id) => {
                    if !is_entity_id(id) {
                        return Err(ToolError::InvalidArgument(format!(
                            "not a PubTator entity identifier: {id}"
                        )));
                    }
                    parts.push(id.clone());
                }
                Clause::Text(term) => {
                    let term = term.trim();
                    if !term.is_empty() {
                        parts.push(term.to_string());
                    }
                }
                Clause::AnyText(alternatives) => {
                    let alts: Vec<&str> = alternatives
                        .iter()
                        .map(|a| a.trim())
                        .filter(|a| !a.is_empty())
                        .collect();
                    if alts.is_empty() {
                        return Err(ToolError::InvalidArgument(
                            "alternative group must not be empty".to_string(),
                        ));
                    }
                    if alts.iter().any(|a| is_entity_id(a)) {
                        return Err(ToolError::InvalidArgument(
                            "entity identifiers cannot be grouped; combine them with AND"
                                .to_string(),
                        ));
                    }
                    if alts.len() == 1 {
                        parts.push(alts[0].to_string());
                    } else {
                        parts.push(format!("({})", alts.join(" OR ")));
                    }
                }
            }
        }

        if parts.is_empty() {
            return Err(ToolError::InvalidArgument(
                "search query must not be empty".to_string(),
            ));
        }
        Ok(parts.join(" AND "))
    }
}
