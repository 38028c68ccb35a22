use docai_answer::confidence::cited_indices;
use docai_answer::prompt::build_context;
use docai_answer::{
    alternatives, build_prompt, extract_citations, supporting_facts, parse_completion, reasoning_trace, score_confidence, synthesize_answer, RecoveryTier,
    StructuredAnswer, MIN_CONFIDENCE, SENTINEL,
};
use docai_core::config::AnswerSettings;
use docai_core::types::{Candidate, Locator};

const LONG_FINAL: &str = "Open the print queue, cancel every stuck job, then restart the spooler service and print a test page to confirm the printer is back online. If it stays offline, reinstall the driver.";

fn candidate(i: usize, dense: Option<f32>, sparse: Option<f32>, fused: f32) -> Candidate {
    Candidate {
        chunk_id: format!("manual.txt:{i}"),
        doc_id: "manual.txt".into(),
        source: "manual.txt".into(),
        locator: Locator { page: 1 + i as u32, start: i * 100, end: i * 100 + 80 },
        text: format!("passage number {i} about the printer spooler"),
        dense_score: dense,
        sparse_score: sparse,
        fused_score: fused,
    }
}

fn candidates(n: usize) -> Vec<Candidate> {
    (0..n).map(|i| candidate(i, Some(0.8), Some(2.0), 1.0 - i as f32 * 0.1)).collect()
}

fn full_completion() -> String {
    format!(
        "STEP 1 - ANALYSIS:\n- The printer   is offline.\n- Jobs are stuck.\n\
         STEP 2 - INFORMATION GATHERING:\nPassage [1] says restart the spooler.\n\
         STEP 3 - REASONING:\nA stuck job blocks the queue [2].\n\
         STEP 4 - SYNTHESIS:\nClear the queue, then restart.\n\
         FINAL ANSWER:\n{LONG_FINAL} [1]\n"
    )
}

#[test]
fn synthesis_recovery_scenario() {
    let completion = "STEP 4 - SYNTHESIS:\nPutting this all together, the answer is: 1. Step one 2. Step two\n\nFINAL ANSWER:\n";
    let answer = synthesize_answer(completion, &candidates(2), &AnswerSettings::default());
    assert!(matches!(answer.tier, RecoveryTier::SynthesisIntro | RecoveryTier::Synthesis));
    let lines: Vec<&str> = answer.answer.lines().collect();
    assert!(lines.contains(&"1. Step one"), "{lines:?}");
    assert!(lines.contains(&"2. Step two"), "{lines:?}");
    assert!(answer.confidence > MIN_CONFIDENCE && answer.confidence < 1.0);
}

#[test]
fn well_formed_final_answer_round_trips() {
    let completion = format!("FINAL ANSWER:\n{LONG_FINAL}\n");
    let answer = synthesize_answer(&completion, &candidates(1), &AnswerSettings::default());
    assert_eq!(answer.tier, RecoveryTier::FinalAnswer);
    assert_eq!(answer.answer, LONG_FINAL);
}

#[test]
fn complete_well_supported_answer_scores_full_confidence() {
    let sections = parse_completion(&full_completion());
    let c = score_confidence(&sections, 5, &AnswerSettings::default());
    assert!((c - 1.0).abs() < 1e-6, "{c}");
}

#[test]
fn confidence_grows_with_support_and_stays_bounded() {
    let sections = parse_completion(&full_completion());
    let settings = AnswerSettings::default();
    let scores: Vec<f32> = (0..6).map(|n| score_confidence(&sections, n, &settings)).collect();
    assert_eq!(scores[0], MIN_CONFIDENCE);
    for pair in scores.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert!(scores.iter().all(|s| (MIN_CONFIDENCE..=1.0).contains(s)));
}

#[test]
fn malformed_completion_degrades_to_sentinel() {
    let answer = synthesize_answer("lorem ipsum dolor", &candidates(3), &AnswerSettings::default());
    assert_eq!(answer.answer, SENTINEL);
    assert_eq!(answer.tier, RecoveryTier::Sentinel);
    assert_eq!(answer.confidence, MIN_CONFIDENCE);
    assert_eq!(answer.citations.len(), 3, "citations still describe what was retrieved");
}

#[test]
fn no_candidates_means_no_citations_and_minimum_confidence() {
    let answer = synthesize_answer(&full_completion(), &[], &AnswerSettings::default());
    assert!(answer.citations.is_empty());
    assert_eq!(answer.confidence, MIN_CONFIDENCE);
}

#[test]
fn no_information_answer() {
    let answer = StructuredAnswer::no_information();
    assert_eq!(answer.answer, SENTINEL);
    assert_eq!(answer.confidence, MIN_CONFIDENCE);
    assert!(answer.citations.is_empty() && answer.reasoning.is_empty());
    let json = serde_json::to_value(&answer).unwrap();
    assert_eq!(json["tier"], "sentinel");
}

#[test]
fn citations_follow_candidate_order() {
    let cands = vec![
        candidate(0, Some(0.9), Some(3.0), 0.95),
        candidate(1, Some(0.7), None, 0.6),
        candidate(2, None, Some(1.5), 0.4),
    ];
    let cites = extract_citations(&cands, "See [1] and [9].");
    let ids: Vec<&str> = cites.iter().map(|c| c.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["manual.txt:0", "manual.txt:1", "manual.txt:2"]);
    assert_eq!(cites.iter().map(|c| c.index).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(cites.iter().map(|c| c.cited).collect::<Vec<_>>(), vec![true, false, false]);
    assert_eq!(cites[0].relevance, 0.95);
    assert_eq!(cites[0].note, "page 1, chars 0-80; dense and lexical match");
    assert_eq!(cites[1].note, "page 2, chars 100-180; dense match");
    assert_eq!(cites[2].note, "page 3, chars 200-280; lexical match");
}

#[test]
fn bracket_lists_are_read() {
    let cited: Vec<usize> = cited_indices("per [2, 3] and [1], not [x] or [").into_iter().collect();
    assert_eq!(cited, vec![1, 2, 3]);
}

#[test]
fn reasoning_trace_lists_intermediate_sections() {
    let trace = reasoning_trace(&parse_completion(&full_completion()));
    assert_eq!(
        trace,
        vec![
            "Analysis: The printer is offline. Jobs are stuck.",
            "Step 2: Passage [1] says restart the spooler.",
            "Step 3: A stuck job blocks the queue [2].",
            "Synthesis: Clear the queue, then restart.",
        ]
    );
}

#[test]
fn prompt_numbers_passages_and_carries_the_template() {
    let prompt = build_prompt("  Why is the printer offline? ", &candidates(2), 6000);
    assert!(prompt.user.contains("[1] manual.txt / page 1 • score=1.00\npassage number 0"));
    assert!(prompt.user.contains("[2] manual.txt / page 2 • score=0.90"));
    assert!(prompt.user.contains("Question: Why is the printer offline?\n"));
    for heading in ["STEP 1 - ANALYSIS:", "STEP 2 - INFORMATION GATHERING:", "STEP 3 - REASONING:", "STEP 4 - SYNTHESIS:", "FINAL ANSWER:"] {
        assert!(prompt.user.contains(heading), "{heading}");
    }
    assert!(prompt.system.contains("[1]"));
}

#[test]
fn context_respects_the_budget() {
    let cands = candidates(3);
    let context = build_context(&cands, 60);
    assert!(context.chars().count() <= 60);
    assert!(context.starts_with("[1] manual.txt"));
    assert!(!context.contains("[2]"));
    assert_eq!(build_context(&[], 100), "");

    let prompt = build_prompt("q", &[], 100);
    assert!(prompt.user.contains("(no passages found)"));
}

const EVIDENCE: &str = "STEP 1 - ANALYSIS:
- The printer is offline.
STEP 2 - INFORMATION GATHERING:
- According to the manual, the spooler holds stuck jobs.
- Passage [2] lists the restart steps.
STEP 3 - REASONING:
However, a driver fault would look the same.
It could also be a network issue.
Check the printer's IP address.
Reinstalling the driver rules that out.
Ignore this line.
STEP 4 - SYNTHESIS:
The source of the fault is the queue.
The document confirms it.
FINAL ANSWER:
According to the document, restart the spooler [1].";

#[test]
fn supporting_facts_come_from_the_working_sections() {
    assert_eq!(
        supporting_facts(EVIDENCE),
        vec![
            "According to the manual, the spooler holds stuck jobs.",
            "Passage [2] lists the restart steps.",
            "The source of the fault is the queue.",
        ]
    );
    assert!(supporting_facts("FINAL ANSWER: According to the manual, restart it.").is_empty());
}

#[test]
fn alternatives_follow_the_first_marker() {
    assert_eq!(alternatives(EVIDENCE), vec!["Check the printer's IP address.", "Reinstalling the driver rules that out."]);
    assert!(alternatives(&full_completion()).is_empty());
    assert_eq!(alternatives("REASONING:\nOn the other hand:\nSYNTHESIS:\nDone."), Vec::<String>::new());
}

#[test]
fn structured_answer_carries_evidence_lines() {
    let answer = synthesize_answer(EVIDENCE, &candidates(2), &AnswerSettings::default());
    assert_eq!(answer.supporting_facts.len(), 3);
    assert_eq!(answer.alternatives.len(), 2);
    let json = serde_json::to_value(&answer).unwrap();
    assert_eq!(json["alternatives"][0], "Check the printer's IP address.");
    assert!(StructuredAnswer::no_information().supporting_facts.is_empty());
}

#[test]
fn citation_excerpts_are_bounded() {
    let mut long = candidate(0, Some(0.9), None, 0.9);
    long.text = format!("{}\n\n{}", "word ".repeat(30), "x".repeat(200));
    let cites = extract_citations(&[long, candidate(1, None, Some(1.0), 0.5)], "");
    assert_eq!(cites[0].excerpt.chars().count(), 203);
    assert!(cites[0].excerpt.starts_with("word word"));
    assert!(cites[0].excerpt.ends_with("x..."));
    assert_eq!(cites[1].excerpt, "passage number 1 about the printer spooler");
}

#[test]
fn reasoning_trace_keeps_leading_decimals() {
    let trace = reasoning_trace(&parse_completion("ANALYSIS:\n3.5 GHz is the base clock.\n2. Boost is higher.\n-5 degrees is too cold."));
    assert_eq!(trace, vec!["Analysis: 3.5 GHz is the base clock. Boost is higher. -5 degrees is too cold."]);
}
