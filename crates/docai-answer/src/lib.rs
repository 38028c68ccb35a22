//! docai-answer
//!
//! Turns a free-form model completion plus the candidates that fed the
//! prompt into a [`StructuredAnswer`]: parse sections, recover the answer
//! text, score confidence, attach citations and evidence lines, format.

pub mod confidence;
pub mod format;
pub mod prompt;
pub mod recover;
pub mod sections;

use serde::{Deserialize, Serialize};
use tracing::debug;

use docai_core::config::AnswerSettings;
use docai_core::types::Candidate;

pub use confidence::{
    alternatives, extract_citations, reasoning_trace, score_confidence, supporting_facts, Citation, MIN_CONFIDENCE,
};
pub use format::format_answer;
pub use prompt::{build_prompt, Prompt};
pub use recover::{recover, Recovered, RecoveryTier, SENTINEL};
pub use sections::{parse_completion, CompletionParser, CompletionSections, SectionLabel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub answer: String,
    /// In `[MIN_CONFIDENCE, 1]`.
    pub confidence: f32,
    pub citations: Vec<Citation>,
    pub reasoning: Vec<String>,
    /// Working lines that point at the evidence, at most three.
    pub supporting_facts: Vec<String>,
    /// Other readings the model mentioned, at most two.
    pub alternatives: Vec<String>,
    pub tier: RecoveryTier,
}

impl StructuredAnswer {
    /// What callers return when retrieval found nothing to answer from.
    pub fn no_information() -> Self {
        Self {
            answer: SENTINEL.to_string(),
            confidence: MIN_CONFIDENCE,
            citations: vec![],
            reasoning: vec![],
            supporting_facts: vec![],
            alternatives: vec![],
            tier: RecoveryTier::Sentinel,
        }
    }
}

/// Never fails: malformed completions degrade to the sentinel answer.
pub fn synthesize_answer(completion: &str, candidates: &[Candidate], settings: &AnswerSettings) -> StructuredAnswer {
    let sections = parse_completion(completion);
    let recovered = recover(&sections, settings);
    let confidence = score_confidence(&sections, candidates.len(), settings);
    debug!(
        sections = sections.labels().len(),
        tier = ?recovered.tier,
        candidates = candidates.len(),
        confidence,
        "synthesized answer"
    );
    StructuredAnswer {
        answer: format_answer(&recovered.text),
        confidence,
        citations: extract_citations(candidates, completion),
        reasoning: reasoning_trace(&sections),
        supporting_facts: supporting_facts(completion),
        alternatives: alternatives(completion),
        tier: recovered.tier,
    }
}
