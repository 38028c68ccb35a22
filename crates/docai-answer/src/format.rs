//! Answer formatter.
//!
//! Four passes, each a total function of its input, applied in order:
//! whitespace normalization, inline numbered-list splitting, sub-step
//! indentation and inline emphasis. The composition is idempotent.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

const SUB_STEP_INDENT: &str = "   ";

pub fn format_answer(text: &str) -> String {
    let text = normalize_whitespace(text);
    let text = split_numbered_steps(&text);
    let text = indent_sub_steps(&text);
    emphasize(&text)
}

/// Line endings to `\n`, trailing spaces stripped, runs of blank lines
/// collapsed to one, no blank lines at either end.
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<&str> = Vec::new();
    for line in unified.split('\n').map(str::trim_end) {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// A `N.` list marker: digits preceded by line start or whitespace and
/// followed by whitespace.
#[derive(Debug, Clone, Copy)]
struct Marker {
    at: usize,
    number: u32,
}

fn markers(line: &str) -> Vec<Marker> {
    let mut found = Vec::new();
    let mut prev: Option<char> = None;
    for (i, c) in line.char_indices() {
        let boundary = prev.is_none_or(char::is_whitespace);
        prev = Some(c);
        if !boundary || !c.is_ascii_digit() {
            continue;
        }
        let digits = line[i..].bytes().take_while(u8::is_ascii_digit).count();
        let dot = i + digits;
        let followed = line[dot..].strip_prefix('.').and_then(|rest| rest.chars().next()).is_some_and(char::is_whitespace);
        if digits <= 3 && followed {
            if let Ok(number) = line[i..dot].parse() {
                found.push(Marker { at: i, number });
            }
        }
    }
    found
}

/// Longest run of markers numbered n, n+1, n+2, ... in line order. The
/// earliest-ending run wins ties.
fn longest_chain(found: &[Marker]) -> Vec<Marker> {
    let mut len = vec![1usize; found.len()];
    let mut prev: Vec<Option<usize>> = vec![None; found.len()];
    for i in 0..found.len() {
        for j in 0..i {
            if found[j].number.checked_add(1) == Some(found[i].number) && len[j] + 1 >= len[i] {
                len[i] = len[j] + 1;
                prev[i] = Some(j);
            }
        }
    }
    let Some(best) = (0..found.len()).fold(None, |acc: Option<usize>, i| match acc {
        Some(b) if len[b] >= len[i] => Some(b),
        _ => Some(i),
    }) else {
        return vec![];
    };
    let mut chain = vec![found[best]];
    let mut cursor = prev[best];
    while let Some(j) = cursor {
        chain.push(found[j]);
        cursor = prev[j];
    }
    chain.reverse();
    chain
}

fn split_line(line: &str) -> Option<Vec<String>> {
    let chain = longest_chain(&markers(line));
    if chain.len() < 2 {
        return None;
    }
    let indent_len = line.len() - line.trim_start().len();
    let indent = &line[..indent_len];
    let cuts: Vec<usize> = chain.iter().map(|m| m.at).filter(|&at| at > indent_len).collect();
    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let head = line[..cuts[0]].trim_end();
    if !head.trim().is_empty() {
        pieces.push(head.to_string());
    }
    for (k, &start) in cuts.iter().enumerate() {
        let end = cuts.get(k + 1).copied().unwrap_or(line.len());
        let body = line[start..end].trim_end();
        if !body.is_empty() {
            pieces.push(format!("{indent}{body}"));
        }
    }
    Some(pieces)
}

/// Break lines holding an inline numbered list ("... 1. foo 2. bar") so
/// that each item starts its own line. Repeats until no line splits.
pub fn split_numbered_steps(text: &str) -> String {
    let mut out = Vec::new();
    let mut pending: Vec<String> = text.split('\n').rev().map(str::to_string).collect();
    while let Some(line) = pending.pop() {
        match split_line(&line) {
            Some(pieces) => pending.extend(pieces.into_iter().rev()),
            None => out.push(line),
        }
    }
    out.join("\n")
}

fn starts_with_marker(line: &str) -> bool {
    markers(line.trim_start()).first().is_some_and(|m| m.at == 0) || {
        let t = line.trim_start();
        let digits = t.bytes().take_while(u8::is_ascii_digit).count();
        (1..=3).contains(&digits) && &t[digits..] == "."
    }
}

fn is_sub_step(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("o ") || t.starts_with("- ") || t.starts_with("• ")
}

/// Indent `o `, `- ` and `• ` items that follow a numbered step.
pub fn indent_sub_steps(text: &str) -> String {
    let mut in_step = false;
    let mut out = Vec::new();
    for line in text.split('\n') {
        if starts_with_marker(line) {
            in_step = true;
            out.push(line.to_string());
        } else if line.trim().is_empty() {
            out.push(line.to_string());
        } else if in_step && is_sub_step(line) {
            out.push(format!("{SUB_STEP_INDENT}{}", line.trim()));
        } else {
            in_step = false;
            out.push(line.to_string());
        }
    }
    out.join("\n")
}

static SHORTCUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ctrl|alt|shift|cmd|win)(?:\s*\+\s*(?:ctrl|alt|shift|cmd|win|delete|del|esc|enter|tab|space|f\d{1,2}|[a-z0-9]))+\b")
        .expect("shortcut pattern is valid")
});

static COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:ipconfig|sfc|chkdsk|netsh|ping|tracert|gpupdate|regedit|msconfig|taskmgr|powershell|dism)\b(?:\s+/[A-Za-z][\w:-]*)*|\b\w+\.msc\b")
        .expect("command pattern is valid")
});

static PROGRAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+\s(?:Manager|Panel|Explorer|Prompt|Editor|Viewer|Update|Center)\b").expect("program pattern is valid")
});

static BOLD_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*\n]+)\*\*:").expect("bold colon pattern is valid"));

/// Spans enclosed by paired `delim`s, or `None` when a delimiter is unpaired.
fn paired_spans(line: &str, delim: &str) -> Option<Vec<Range<usize>>> {
    let at: Vec<usize> = line.match_indices(delim).map(|(i, _)| i).collect();
    if at.len() % 2 == 1 {
        return None;
    }
    Some(at.chunks(2).map(|p| p[0]..p[1] + delim.len()).collect())
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn emphasize_line(line: &str) -> String {
    let (Some(bold), Some(code)) = (paired_spans(line, "**"), paired_spans(line, "`")) else {
        return line.to_string();
    };
    let protected: Vec<Range<usize>> = bold.into_iter().chain(code).collect();

    let mut found: Vec<Range<usize>> =
        [&*SHORTCUT, &*COMMAND, &*PROGRAM].into_iter().flat_map(|re| re.find_iter(line).map(|m| m.range())).collect();
    found.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut accepted: Vec<Range<usize>> = Vec::new();
    for m in found {
        if protected.iter().any(|p| overlaps(p, &m)) || accepted.last().is_some_and(|a| overlaps(a, &m)) {
            continue;
        }
        accepted.push(m);
    }
    if accepted.is_empty() {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + accepted.len() * 4);
    let mut cursor = 0;
    for m in accepted {
        out.push_str(&line[cursor..m.start]);
        out.push_str("**");
        out.push_str(&line[m.clone()]);
        out.push_str("**");
        cursor = m.end;
    }
    out.push_str(&line[cursor..]);
    out
}

/// Bold keyboard shortcuts, known commands and program names, then move a
/// colon that trails bold text inside it (`**Note**:` becomes `**Note:**`).
/// Lines with unbalanced `**` or backticks are left alone.
pub fn emphasize(text: &str) -> String {
    let mut out = text.split('\n').map(emphasize_line).collect::<Vec<_>>().join("\n");
    loop {
        let next = BOLD_COLON.replace_all(&out, "**${1}:**").into_owned();
        if next == out {
            return out;
        }
        out = next;
    }
}
