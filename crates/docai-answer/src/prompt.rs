//! Prompt assembly: numbered context passages plus the step template the
//! completion parser understands.

use serde::{Deserialize, Serialize};

use docai_core::types::Candidate;

pub const SYSTEM_PROMPT: &str = "You are a careful technical assistant. Answer only from the numbered \
context passages. Cite passages with their number in square brackets, e.g. [1] or [2, 3]. If the \
context does not contain the answer, say so.";

const TEMPLATE: &str = "Work through the question in these steps:

STEP 1 - ANALYSIS:
Restate what is being asked and what a complete answer needs.

STEP 2 - INFORMATION GATHERING:
List the relevant facts from the context, citing passages as [n].

STEP 3 - REASONING:
Connect the facts to the question.

STEP 4 - SYNTHESIS:
Putting this all together, the answer is... (give every step of any procedure as a numbered list)

FINAL ANSWER:
The complete answer, including all steps, with citations.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

fn header(index: usize, candidate: &Candidate) -> String {
    format!("[{index}] {} / page {} • score={:.2}", candidate.source, candidate.locator.page, candidate.fused_score)
}

/// Context block of at most `max_chars` characters. Passages are added in
/// ranker order until the budget runs out; the first passage is truncated
/// rather than dropped so the model always sees some context.
pub fn build_context(candidates: &[Candidate], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for (i, candidate) in candidates.iter().enumerate() {
        let entry = format!("{}\n{}\n\n", header(i + 1, candidate), candidate.text.trim());
        let len = entry.chars().count();
        if used + len <= max_chars {
            out.push_str(&entry);
            used += len;
        } else if i == 0 {
            out.extend(entry.chars().take(max_chars));
            break;
        } else {
            break;
        }
    }
    out.trim_end().to_string()
}

pub fn build_prompt(question: &str, candidates: &[Candidate], max_context_chars: usize) -> Prompt {
    let context = build_context(candidates, max_context_chars);
    let user = if context.is_empty() {
        format!("Context: (no passages found)\n\nQuestion: {}\n\n{TEMPLATE}", question.trim())
    } else {
        format!("Context:\n{context}\n\nQuestion: {}\n\n{TEMPLATE}", question.trim())
    };
    Prompt { system: SYSTEM_PROMPT.to_string(), user }
}
