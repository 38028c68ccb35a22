//! Completion parser: splits a model completion into labelled sections.
//!
//! A line-by-line state machine. The state is `Outside` or the label of the
//! section being filled. Heading lines are recognized through the declared
//! table in [`HEADING_TABLE`] and switch state; every other line is appended
//! verbatim to the current section. Lines before the first heading are
//! dropped. Inside the final answer only a keyword heading switches state,
//! so a procedure written as `Step 1:` lines stays part of the answer.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionLabel {
    Analysis,
    ReasoningStep(u32),
    Synthesis,
    FinalAnswer,
}

impl fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => write!(f, "Analysis"),
            Self::ReasoningStep(n) => write!(f, "Step {n}"),
            Self::Synthesis => write!(f, "Synthesis"),
            Self::FinalAnswer => write!(f, "Final answer"),
        }
    }
}

/// Where a heading row sends the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Label named by the heading keyword, step number taken from the line.
    Keyword,
    /// Always a reasoning step with the number on the line.
    NumberedStep,
    /// A reasoning step numbered one past the highest seen so far.
    NextStep,
    Fixed(SectionLabel),
}

pub struct HeadingRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub target: Target,
}

fn rule(name: &'static str, pattern: &str, target: Target) -> HeadingRule {
    HeadingRule { name, pattern: Regex::new(pattern).expect("heading pattern is valid"), target }
}

// Body text may follow a heading after a colon or dash; a keyword running on
// into a sentence ("Analysis of the logs...") is not a heading.
const TAIL: &str = r"[\s*_]*(?:[:\-–—]|$)";

/// Heading patterns, tried in order against a line with leading markdown
/// decoration (`#`, `*`, `_`, `>`) removed. Matching is case-insensitive.
pub static HEADING_TABLE: LazyLock<Vec<HeadingRule>> = LazyLock::new(|| {
    vec![
        rule(
            "numbered-keyword",
            &format!(
                r"(?i)^step\s*(?P<n>\d{{1,3}})\s*[-–—:.)]*\s*(?P<kw>analysis|information\s+gathering|reasoning|verification|evaluation|synthesis|final\s+answer){TAIL}"
            ),
            Target::Keyword,
        ),
        rule("numbered-bare", r"(?i)^step\s*(?P<n>\d{1,3})[\s*_]*[-–—:.)]*[\s*_]*$", Target::NumberedStep),
        rule("final-answer", &format!(r"(?i)^final\s+answer{TAIL}"), Target::Fixed(SectionLabel::FinalAnswer)),
        rule("synthesis", &format!(r"(?i)^synthesis{TAIL}"), Target::Fixed(SectionLabel::Synthesis)),
        rule("analysis", &format!(r"(?i)^analysis{TAIL}"), Target::Fixed(SectionLabel::Analysis)),
        rule("reasoning", &format!(r"(?i)^(?:reasoning|information\s+gathering){TAIL}"), Target::NextStep),
    ]
});

static REMAINDER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s:.\-–—*_)]+").expect("remainder pattern is valid"));

/// A recognized heading line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub rule: &'static str,
    pub target: Target,
    pub step: Option<u32>,
    pub keyword: Option<String>,
    /// Text after the heading on the same line, decoration stripped.
    pub remainder: String,
}

fn strip_decoration(line: &str) -> &str {
    line.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '#' | '*' | '_' | '>'))
}

/// Match one line against the heading table.
pub fn classify_heading(line: &str) -> Option<Heading> {
    let stripped = strip_decoration(line);
    for r in HEADING_TABLE.iter() {
        let Some(caps) = r.pattern.captures(stripped) else { continue };
        let end = caps.get(0).map_or(0, |m| m.end());
        let rest = REMAINDER_PREFIX.replace(&stripped[end..], "");
        return Some(Heading {
            rule: r.name,
            target: r.target,
            step: caps.name("n").and_then(|m| m.as_str().parse().ok()),
            keyword: caps.name("kw").map(|m| m.as_str().to_lowercase()),
            remainder: rest.trim_end().to_string(),
        });
    }
    None
}

fn keyword_label(keyword: &str, step: u32) -> SectionLabel {
    let words: Vec<&str> = keyword.split_whitespace().collect();
    match words.as_slice() {
        ["analysis"] => SectionLabel::Analysis,
        ["synthesis"] => SectionLabel::Synthesis,
        ["final", "answer"] => SectionLabel::FinalAnswer,
        _ => SectionLabel::ReasoningStep(step),
    }
}

/// Parsed sections. A label is present iff its heading was seen, whether or
/// not any body text followed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSections {
    sections: BTreeMap<SectionLabel, String>,
    order: Vec<SectionLabel>,
}

impl CompletionSections {
    pub fn is_present(&self, label: SectionLabel) -> bool {
        self.sections.contains_key(&label)
    }

    /// Section body with blank edge lines removed; `""` when absent.
    pub fn text(&self, label: SectionLabel) -> &str {
        self.sections.get(&label).map_or("", String::as_str)
    }

    /// Labels in the order their headings first appeared.
    pub fn labels(&self) -> &[SectionLabel] {
        &self.order
    }

    pub fn reasoning_steps(&self) -> Vec<(u32, &str)> {
        self.sections
            .iter()
            .filter_map(|(label, text)| match label {
                SectionLabel::ReasoningStep(n) => Some((*n, text.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Share of the expected sections (analysis, at least one reasoning
    /// step, synthesis, final answer) that were present.
    pub fn completeness(&self) -> f32 {
        let found = [
            self.is_present(SectionLabel::Analysis),
            !self.reasoning_steps().is_empty(),
            self.is_present(SectionLabel::Synthesis),
            self.is_present(SectionLabel::FinalAnswer),
        ];
        found.iter().filter(|p| **p).count() as f32 / found.len() as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    In(SectionLabel),
}

/// Streaming form of the parser: feed lines, then `finish`.
#[derive(Debug)]
pub struct CompletionParser {
    state: State,
    max_step: u32,
    lines: BTreeMap<SectionLabel, Vec<String>>,
    order: Vec<SectionLabel>,
}

impl Default for CompletionParser {
    fn default() -> Self {
        Self { state: State::Outside, max_step: 0, lines: BTreeMap::new(), order: Vec::new() }
    }
}

impl CompletionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, line: &str) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(heading) = classify_heading(line).filter(|h| self.switches_on(h)) {
            let label = self.resolve(&heading);
            self.enter(label);
            if !heading.remainder.is_empty() {
                self.push(label, heading.remainder);
            }
            return;
        }
        if let State::In(label) = self.state {
            self.push(label, line.to_string());
        }
    }

    fn switches_on(&self, heading: &Heading) -> bool {
        self.state != State::In(SectionLabel::FinalAnswer)
            || !matches!(heading.target, Target::NumberedStep | Target::NextStep)
    }

    fn resolve(&mut self, heading: &Heading) -> SectionLabel {
        let step = heading.step.unwrap_or(self.max_step + 1);
        let label = match heading.target {
            Target::Fixed(label) => label,
            Target::NumberedStep => SectionLabel::ReasoningStep(step),
            Target::NextStep => SectionLabel::ReasoningStep(self.max_step + 1),
            Target::Keyword => keyword_label(heading.keyword.as_deref().unwrap_or(""), step),
        };
        if let SectionLabel::ReasoningStep(n) = label {
            self.max_step = self.max_step.max(n);
        }
        label
    }

    fn enter(&mut self, label: SectionLabel) {
        self.state = State::In(label);
        if !self.lines.contains_key(&label) {
            self.order.push(label);
            self.lines.insert(label, Vec::new());
        }
    }

    fn push(&mut self, label: SectionLabel, line: String) {
        self.lines.entry(label).or_default().push(line);
    }

    pub fn finish(self) -> CompletionSections {
        let sections = self.lines.into_iter().map(|(label, lines)| (label, trim_blank_edges(&lines))).collect();
        CompletionSections { sections, order: self.order }
    }
}

fn trim_blank_edges(lines: &[String]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.trim().is_empty()).map_or(start, |i| i + 1);
    lines[start..end.max(start)].join("\n")
}

/// Parse a whole completion. Never fails; text with no headings yields an
/// empty result.
pub fn parse_completion(text: &str) -> CompletionSections {
    let mut parser = CompletionParser::new();
    for line in text.split('\n') {
        parser.feed_line(line);
    }
    parser.finish()
}
