//! Confidence score, citations, the reasoning trace and the evidence lines
//! (supporting facts, alternatives) pulled from the completion.
//!
//! Everything here is derived from the parsed sections and the candidate
//! list that fed the prompt. Nothing is invented: with no candidates there
//! are no citations and confidence sits at [`MIN_CONFIDENCE`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use docai_core::config::AnswerSettings;
use docai_core::types::{Candidate, ChunkId, Locator};

use crate::recover::{recover, RecoveryTier};
use crate::sections::{classify_heading, CompletionSections, Heading, SectionLabel, Target};

pub const MIN_CONFIDENCE: f32 = 0.1;

const W_SECTIONS: f32 = 0.3;
const W_LENGTH: f32 = 0.2;
const W_SUPPORT: f32 = 0.3;
const W_FINAL: f32 = 0.1;

/// Weighted sum of indicators, clamped to `[MIN_CONFIDENCE, 1]`:
/// section completeness, answer length over `min_answer_chars`, candidate
/// support saturating at `supporting_candidates`, and whether the model's
/// own final answer was usable as is.
pub fn score_confidence(sections: &CompletionSections, candidate_count: usize, settings: &AnswerSettings) -> f32 {
    if candidate_count == 0 {
        return MIN_CONFIDENCE;
    }
    let recovered = recover(sections, settings);
    if recovered.tier == RecoveryTier::Sentinel {
        return MIN_CONFIDENCE;
    }
    let long_enough = recovered.text.chars().count() >= settings.min_answer_chars;
    let support = candidate_count as f32 / settings.supporting_candidates.max(1) as f32;

    let mut score = MIN_CONFIDENCE + W_SECTIONS * sections.completeness();
    if long_enough {
        score += W_LENGTH;
    }
    score += W_SUPPORT * support.min(1.0);
    if recovered.tier == RecoveryTier::FinalAnswer {
        score += W_FINAL;
    }
    score.clamp(MIN_CONFIDENCE, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based position in the context passed to the model; `[n]` refers to it.
    pub index: usize,
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub source: String,
    pub locator: Locator,
    /// The candidate's fused score.
    pub relevance: f32,
    pub note: String,
    /// Start of the passage text, whitespace collapsed.
    pub excerpt: String,
    /// The completion referenced this passage with an `[n]` marker.
    pub cited: bool,
}

static BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d{1,3}(?:\s*,\s*\d{1,3})*)\]").expect("citation pattern is valid"));

/// Passage numbers referenced as `[n]` or `[n, m]` in `completion`.
pub fn cited_indices(completion: &str) -> BTreeSet<usize> {
    BRACKETS
        .captures_iter(completion)
        .flat_map(|caps| {
            caps[1].split(',').filter_map(|n| n.trim().parse::<usize>().ok()).collect::<Vec<_>>()
        })
        .collect()
}

fn match_note(candidate: &Candidate) -> &'static str {
    match (candidate.dense_score.is_some(), candidate.sparse_score.is_some()) {
        (true, true) => "dense and lexical match",
        (true, false) => "dense match",
        (false, true) => "lexical match",
        (false, false) => "ranked",
    }
}

pub const EXCERPT_CHARS: usize = 200;

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

/// One citation per candidate, in ranker order. Out-of-range `[n]` markers
/// are ignored.
pub fn extract_citations(candidates: &[Candidate], completion: &str) -> Vec<Citation> {
    let cited = cited_indices(completion);
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| Citation {
            index: i + 1,
            chunk_id: c.chunk_id.clone(),
            doc_id: c.doc_id.clone(),
            source: c.source.clone(),
            locator: c.locator,
            relevance: c.fused_score,
            note: format!("{}; {}", c.locator, match_note(c)),
            excerpt: excerpt(&c.text),
            cited: cited.contains(&(i + 1)),
        })
        .collect()
}

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-•*]|o|\d{1,3}[.)])(?:\s+|$)").expect("bullet pattern is valid"));

fn flatten(text: &str) -> String {
    text.lines()
        .map(|l| BULLET.replace(l, "").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"Label: text"` per non-empty section before the final answer, in the
/// order the headings appeared.
pub fn reasoning_trace(sections: &CompletionSections) -> Vec<String> {
    sections
        .labels()
        .iter()
        .filter(|l| **l != SectionLabel::FinalAnswer)
        .filter_map(|label| {
            let text = flatten(sections.text(*label));
            (!text.is_empty()).then(|| format!("{label}: {text}"))
        })
        .collect()
}

pub const MAX_SUPPORTING_FACTS: usize = 3;
pub const MAX_ALTERNATIVES: usize = 2;

const FACT_MARKERS: [&str; 5] = ["according to", "the document", "source", "data shows", "passage"];
const ALTERNATIVE_MARKERS: [&str; 4] = ["alternative", "however", "on the other hand", "it could also"];

fn opens_final_answer(h: &Heading) -> bool {
    h.target == Target::Fixed(SectionLabel::FinalAnswer) || h.keyword.as_deref().is_some_and(|k| k.starts_with("final"))
}

/// Lines before the final-answer heading, each flagged `true` if it is a
/// heading. Text after a heading on the same line becomes its own line.
fn body_lines(completion: &str) -> Vec<(bool, String)> {
    let mut out = Vec::new();
    for line in completion.lines() {
        match classify_heading(line) {
            Some(h) if opens_final_answer(&h) => break,
            Some(h) => {
                out.push((true, String::new()));
                if !h.remainder.is_empty() {
                    out.push((false, h.remainder));
                }
            }
            None => out.push((false, line.to_string())),
        }
    }
    out
}

fn clean(line: &str) -> String {
    BULLET.replace(line, "").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lines from the working sections that point at the retrieved evidence.
pub fn supporting_facts(completion: &str) -> Vec<String> {
    body_lines(completion)
        .into_iter()
        .filter(|(heading, _)| !heading)
        .map(|(_, line)| clean(&line))
        .filter(|line| {
            let lower = line.to_lowercase();
            !line.is_empty() && (FACT_MARKERS.iter().any(|m| lower.contains(m)) || !cited_indices(line).is_empty())
        })
        .take(MAX_SUPPORTING_FACTS)
        .collect()
}

/// Lines following the first mention of another reading, up to the next
/// heading.
pub fn alternatives(completion: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut collecting = false;
    for (heading, line) in body_lines(completion) {
        if heading {
            if collecting {
                break;
            }
            continue;
        }
        let line = clean(&line);
        let lower = line.to_lowercase();
        if ALTERNATIVE_MARKERS.iter().any(|m| lower.contains(m)) {
            collecting = true;
            continue;
        }
        if collecting && !line.is_empty() {
            out.push(line);
            if out.len() == MAX_ALTERNATIVES {
                break;
            }
        }
    }
    out
}
