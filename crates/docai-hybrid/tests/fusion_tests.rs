use docai_core::error::Error;
use docai_core::types::{SearchHit, SourceKind};
use docai_hybrid::{fuse, min_max_normalize, FusionWeights};
use proptest::prelude::*;
use std::collections::HashSet;

fn dense(id: &str, score: f32) -> SearchHit {
    SearchHit { id: id.into(), score, source: SourceKind::Dense }
}

fn sparse(id: &str, score: f32) -> SearchHit {
    SearchHit { id: id.into(), score, source: SourceKind::Sparse }
}

fn weights(d: f32, s: f32) -> FusionWeights {
    FusionWeights::new(d, s).unwrap()
}

#[test]
fn normalization_maps_into_unit_range() {
    assert_eq!(min_max_normalize(&[2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
    assert_eq!(min_max_normalize(&[0.3, 0.3]), vec![1.0, 1.0], "constant list is all 1.0");
    assert!(min_max_normalize(&[]).is_empty());
}

#[test]
fn negative_or_nan_weights_are_rejected() {
    assert!(matches!(FusionWeights::new(-0.1, 0.4), Err(Error::InvalidParameter(_))));
    assert!(matches!(FusionWeights::new(0.6, f32::NAN), Err(Error::InvalidParameter(_))));
    assert!(FusionWeights::new(2.0, 3.0).is_ok(), "weights need not sum to 1");
}

#[test]
fn union_keeps_single_list_hits() {
    let d = [dense("a:0", 0.9), dense("a:1", 0.5)];
    let s = [sparse("b:0", 7.0), sparse("a:1", 2.0)];
    let out = fuse(&d, &s, weights(0.6, 0.4), 10);
    let ids: Vec<&str> = out.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["a:0", "b:0", "a:1"]);
    // a:0 dense only: 0.6 * 1.0; b:0 sparse only: 0.4 * 1.0; a:1: 0 + 0
    assert!((out[0].fused - 0.6).abs() < 1e-6);
    assert!((out[1].fused - 0.4).abs() < 1e-6);
    assert_eq!(out[1].dense, None);
    assert_eq!(out[1].sparse, Some(7.0));
    assert_eq!(out[2].dense, Some(0.5));
    assert_eq!(out[2].sparse, Some(2.0));
}

#[test]
fn zero_sparse_scores_are_not_evidence() {
    let d = [dense("x:0", 0.2)];
    let s = [sparse("y:0", 0.0), sparse("x:0", 0.0)];
    let out = fuse(&d, &s, weights(0.6, 0.4), 10);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, "x:0");
    assert_eq!(out[0].sparse, None);
}

#[test]
fn ties_break_by_chunk_id() {
    let d = [dense("m:1", 0.5), dense("c:4", 0.5), dense("k:0", 0.5)];
    for _ in 0..3 {
        let out = fuse(&d, &[], weights(1.0, 0.0), 10);
        let ids: Vec<&str> = out.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["c:4", "k:0", "m:1"]);
    }
}

#[test]
fn empty_inputs_fuse_to_nothing() {
    assert!(fuse(&[], &[], weights(0.6, 0.4), 5).is_empty());
    assert!(fuse(&[dense("a", 1.0)], &[], weights(0.6, 0.4), 0).is_empty());
}

fn hit_lists() -> impl Strategy<Value = (Vec<(u8, f32)>, Vec<(u8, f32)>)> {
    (
        proptest::collection::vec((0u8..30, -1.0f32..1.0), 0..25),
        proptest::collection::vec((0u8..30, 0.0f32..20.0), 0..25),
    )
}

fn to_hits(raw: &[(u8, f32)], source: SourceKind) -> Vec<SearchHit> {
    raw.iter().map(|(id, s)| SearchHit { id: format!("doc:{id}"), score: *s, source }).collect()
}

proptest! {
    #[test]
    fn fused_output_is_sorted_and_unique((d, s) in hit_lists(), wd in 0.0f32..2.0, ws in 0.0f32..2.0, k in 0usize..40) {
        let out = fuse(&to_hits(&d, SourceKind::Dense), &to_hits(&s, SourceKind::Sparse), weights(wd, ws), k);
        prop_assert!(out.len() <= k);
        let ids: HashSet<&str> = out.iter().map(|h| h.id.as_str()).collect();
        prop_assert_eq!(ids.len(), out.len());
        for pair in out.windows(2) {
            prop_assert!(pair[0].fused > pair[1].fused || (pair[0].fused == pair[1].fused && pair[0].id < pair[1].id));
        }
    }

    #[test]
    fn raising_dense_weight_favours_stronger_dense_scores((d, s) in hit_lists(), wd in 0.0f32..1.0, bump in 0.0f32..1.0, ws in 0.0f32..1.0) {
        let dh = to_hits(&d, SourceKind::Dense);
        let sh = to_hits(&s, SourceKind::Sparse);
        let before = fuse(&dh, &sh, weights(wd, ws), usize::MAX);
        let after = fuse(&dh, &sh, weights(wd + bump, ws), usize::MAX);
        prop_assert_eq!(before.len(), after.len());
        for a in &before {
            let a2 = after.iter().find(|h| h.id == a.id).unwrap();
            prop_assert!(a2.fused >= a.fused - 1e-6, "fused score never decreases");
            for b in &before {
                if a.norm_dense >= b.norm_dense {
                    let b2 = after.iter().find(|h| h.id == b.id).unwrap();
                    // a's lead over b can only grow.
                    prop_assert!((a2.fused - b2.fused) >= (a.fused - b.fused) - 1e-5);
                }
            }
        }
    }
}
