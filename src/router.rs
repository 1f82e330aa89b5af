//! Query Router
//!
//! Keyword heuristic deciding whether a question goes to the placement
//! pipeline or the general knowledge pipeline. Not an intent classifier.

use serde::{Deserialize, Serialize};

pub const PLACEMENT_KEYWORDS: [&str; 5] = ["placement", "placed", "package", "ctc", "company"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineChoice {
    Placement,
    GenericRag,
}

/// Placement if the lower-cased question contains any placement keyword.
pub fn route(question: &str) -> PipelineChoice {
    let question = question.to_lowercase();
    if PLACEMENT_KEYWORDS.iter().any(|k| question.contains(*k)) {
        PipelineChoice::Placement
    } else {
        PipelineChoice::GenericRag
    }
}
