//! Plain-text rendering for the terminal.

use std::fmt::Write;

use docai_answer::StructuredAnswer;
use docai_core::types::Candidate;
use docai_hybrid::IndexStatus;

fn score(value: Option<f32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

pub fn render_candidates(query: &str, candidates: &[Candidate]) -> String {
    let mut out = String::new();
    if candidates.is_empty() {
        let _ = writeln!(out, "No passages found for \"{query}\".");
        return out;
    }
    let _ = writeln!(out, "Found {} passages for \"{query}\":", candidates.len());
    for (i, c) in candidates.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n  {}. fused={:.4} dense={} sparse={}  {} ({})",
            i + 1,
            c.fused_score,
            score(c.dense_score),
            score(c.sparse_score),
            c.source,
            c.locator
        );
        let _ = writeln!(out, "     {}", snippet(&c.text, 160));
    }
    out
}

pub fn render_answer(answer: &StructuredAnswer) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", answer.answer);
    let _ = writeln!(out, "Confidence: {:.0}%", answer.confidence * 100.0);
    if !answer.citations.is_empty() {
        let _ = writeln!(out, "\nSources:");
        for c in &answer.citations {
            let mark = if c.cited { "*" } else { " " };
            let _ = writeln!(out, " {mark}[{}] {} ({}) relevance={:.2}", c.index, c.source, c.note, c.relevance);
        }
    }
    out
}

pub fn render_reasoning(answer: &StructuredAnswer) -> String {
    let mut out = String::new();
    for (i, step) in answer.reasoning.iter().enumerate() {
        let _ = writeln!(out, "{}. {step}", i + 1);
    }
    for (title, lines) in [("Supporting facts", &answer.supporting_facts), ("Alternatives", &answer.alternatives)] {
        if lines.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{title}:");
        for line in lines {
            let _ = writeln!(out, " - {line}");
        }
    }
    out
}

pub fn render_status(status: &IndexStatus) -> String {
    if !status.loaded {
        return format!("No index loaded (embedder {}).\n", status.embedder_id);
    }
    format!(
        "Index: {} documents, {} chunks, {} terms\nEmbedder: {} (dim {})\n",
        status.documents, status.chunks, status.vocabulary, status.embedder_id, status.dim
    )
}
