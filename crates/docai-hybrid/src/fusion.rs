//! Weighted min-max fusion of the dense and sparse hit lists.
//!
//! Each list is normalized into `[0,1]` on its own, then
//! `fused = dense_weight * norm_dense + sparse_weight * norm_sparse` over the
//! union of chunk ids. A chunk missing from one list gets 0 for that part.

use std::collections::BTreeMap;

use docai_core::error::{Error, Result};
use docai_core::types::{ChunkId, SearchHit};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub dense: f32,
    pub sparse: f32,
}

impl FusionWeights {
    /// Weights need not sum to 1 but must be finite and non-negative.
    pub fn new(dense: f32, sparse: f32) -> Result<Self> {
        for (name, w) in [("dense_weight", dense), ("sparse_weight", sparse)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidParameter(format!("{name} must be a non-negative number, got {w}")));
            }
        }
        Ok(Self { dense, sparse })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub id: ChunkId,
    /// Raw index scores; `None` when the chunk was absent from that list.
    pub dense: Option<f32>,
    pub sparse: Option<f32>,
    pub norm_dense: f32,
    pub norm_sparse: f32,
    pub fused: f32,
}

/// Min-max normalize into `[0,1]`. A constant list maps to all 1.0.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let (min, max) = scores
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let range = max - min;
    scores
        .iter()
        .map(|&s| if range > 0.0 { ((s - min) / range).clamp(0.0, 1.0) } else { 1.0 })
        .collect()
}

/// One score per chunk id; duplicates within a list keep the best score.
fn best_per_id(hits: &[SearchHit]) -> BTreeMap<&str, f32> {
    let mut best: BTreeMap<&str, f32> = BTreeMap::new();
    for h in hits {
        best.entry(h.id.as_str()).and_modify(|s| *s = s.max(h.score)).or_insert(h.score);
    }
    best
}

/// Fuse two hit lists and return the best `top_k`, ordered by fused score
/// descending with chunk id ascending as the tie-break.
///
/// Sparse hits scoring 0 carry no lexical evidence and are dropped before
/// normalization, so they neither stretch the range nor join the union.
pub fn fuse(dense: &[SearchHit], sparse: &[SearchHit], weights: FusionWeights, top_k: usize) -> Vec<FusedHit> {
    let dense = best_per_id(dense);
    let mut sparse = best_per_id(sparse);
    sparse.retain(|_, s| *s > 0.0);

    let mut merged: BTreeMap<&str, FusedHit> = BTreeMap::new();
    let dense_scores: Vec<f32> = dense.values().copied().collect();
    for ((id, raw), norm) in dense.iter().zip(min_max_normalize(&dense_scores)) {
        merged.insert(*id, FusedHit { id: id.to_string(), dense: Some(*raw), sparse: None, norm_dense: norm, norm_sparse: 0.0, fused: 0.0 });
    }
    let sparse_scores: Vec<f32> = sparse.values().copied().collect();
    for ((id, raw), norm) in sparse.iter().zip(min_max_normalize(&sparse_scores)) {
        let hit = merged.entry(*id).or_insert_with(|| FusedHit {
            id: id.to_string(),
            dense: None,
            sparse: None,
            norm_dense: 0.0,
            norm_sparse: 0.0,
            fused: 0.0,
        });
        hit.sparse = Some(*raw);
        hit.norm_sparse = norm;
    }

    let mut fused: Vec<FusedHit> = merged
        .into_values()
        .map(|mut h| {
            h.fused = weights.dense * h.norm_dense + weights.sparse * h.norm_sparse;
            h
        })
        .collect();
    fused.sort_by(|a, b| b.fused.total_cmp(&a.fused).then_with(|| a.id.cmp(&b.id)));
    fused.truncate(top_k);
    fused
}
