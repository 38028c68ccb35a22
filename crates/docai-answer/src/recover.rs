//! Answer recovery: pick the best answer text from the parsed sections.
//!
//! Tiers, first acceptable wins:
//! 1. final answer, if at least `min_final_answer_chars` long
//! 2. synthesis from its first intro-phrase line on, if enumerated detail follows
//! 3. the whole synthesis
//! 4. final answer of any length
//! 5. the sentinel
//!
//! Models often put the full procedure in the synthesis and leave a one-line
//! summary under the final-answer heading; tier 2 exists for that case. The
//! thresholds and phrases come from `AnswerSettings` and are tunable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use docai_core::config::AnswerSettings;

use crate::sections::{CompletionSections, SectionLabel};

pub const SENTINEL: &str = "I was unable to produce an answer from the provided documents.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryTier {
    FinalAnswer,
    SynthesisIntro,
    Synthesis,
    ShortFinalAnswer,
    Sentinel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub text: String,
    pub tier: RecoveryTier,
}

static ENUMERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|\s)\d{1,3}[.)]\s+\S|^\s*(?:[-•*]|o)\s+\S").expect("enumeration pattern is valid")
});

pub fn has_enumeration(text: &str) -> bool {
    ENUMERATION.is_match(text)
}

fn opens_with_intro(line: &str, phrases: &[String]) -> bool {
    let lead = line.trim_start_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
    phrases.iter().any(|p| !p.is_empty() && lead.starts_with(&p.to_lowercase()))
}

/// Synthesis text from the first intro-phrase line to the end, provided the
/// excerpt goes on to enumerate steps or items.
pub fn synthesis_from_intro(synthesis: &str, phrases: &[String]) -> Option<String> {
    let lines: Vec<&str> = synthesis.lines().collect();
    let start = lines.iter().position(|l| opens_with_intro(l, phrases))?;
    let excerpt = lines[start..].join("\n");
    let excerpt = excerpt.trim();
    (!excerpt.is_empty() && has_enumeration(excerpt)).then(|| excerpt.to_string())
}

pub fn recover(sections: &CompletionSections, settings: &AnswerSettings) -> Recovered {
    let final_answer = sections.text(SectionLabel::FinalAnswer).trim();
    let synthesis = sections.text(SectionLabel::Synthesis).trim();

    if !final_answer.is_empty() && final_answer.chars().count() >= settings.min_final_answer_chars {
        return Recovered { text: final_answer.to_string(), tier: RecoveryTier::FinalAnswer };
    }
    if let Some(text) = synthesis_from_intro(synthesis, &settings.intro_phrases) {
        return Recovered { text, tier: RecoveryTier::SynthesisIntro };
    }
    if !synthesis.is_empty() {
        return Recovered { text: synthesis.to_string(), tier: RecoveryTier::Synthesis };
    }
    if !final_answer.is_empty() {
        return Recovered { text: final_answer.to_string(), tier: RecoveryTier::ShortFinalAnswer };
    }
    Recovered { text: SENTINEL.to_string(), tier: RecoveryTier::Sentinel }
}
