//! Core domain types shared by the agent pipeline and the CLI.

pub mod classification;
pub mod evaluation;

pub use classification::{
    LocalClassification, QueryClassification, QueryType, extract_identifier, is_greeting,
    local_query_type,
};
pub use evaluation::{QualityEvaluation, QualityScore};
