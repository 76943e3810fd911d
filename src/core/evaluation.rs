//! Judge verdicts on a research answer.
//!
//! A [`QualityEvaluation`] is produced once per judge iteration and consumed
//! immediately: the score decides whether the loop continues, and the
//! feedback plus suggestions are folded into the next retry query.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Quality score assigned by the judge, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum QualityScore {
    /// The answer meets the quality bar.
    Pass = 0,
    /// The answer is usable but incomplete.
    NeedsImprovement = 1,
    /// The answer does not address the query.
    Fail = 2,
}

impl QualityScore {
    /// Parses a score string (case-insensitive, accepts spaces or dashes).
    ///
    /// Returns `None` for unrecognised input so callers can treat the
    /// evaluation as unparseable rather than guessing a verdict.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "pass" | "passed" => Some(Self::Pass),
            "needs_improvement" => Some(Self::NeedsImprovement),
            "fail" | "failed" => Some(Self::Fail),
            _ => None,
        }
    }

    /// Returns `true` if the score ends the refinement loop.
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::NeedsImprovement => "needs_improvement",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for QualityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured judge output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QualityEvaluation {
    /// Overall verdict.
    pub score: QualityScore,
    /// Free-text explanation of the verdict.
    pub feedback: String,
    /// Concrete improvements, in priority order.
    #[serde(default)]
    pub suggestions: Vec<String>,
}
