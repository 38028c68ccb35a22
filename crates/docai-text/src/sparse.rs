//! Okapi-BM25 over in-memory postings.
//!
//! Documents are addressed by ordinal (their position in the build input), so
//! the caller maps ordinals back to chunk ids. Scores are non-negative; the
//! idf term is `ln(1 + (N - df + 0.5) / (df + 0.5))`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use docai_core::error::{Error, Result};

use crate::analyzer::analyze;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
	/// Term-frequency saturation.
	pub k1: f32,
	/// Length normalization (0 = none, 1 = full).
	pub b: f32,
}

impl Default for Bm25Params {
	fn default() -> Self { Self { k1: 1.5, b: 0.75 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
	pub ordinal: u32,
	pub tf: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseIndex {
	params: Bm25Params,
	/// term -> postings ordered by ordinal; `len()` is the document frequency.
	postings: BTreeMap<String, Vec<Posting>>,
	doc_lens: Vec<u32>,
	total_len: u64,
}

impl SparseIndex {
	pub fn build<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
		Self::with_params(Bm25Params::default(), texts)
	}

	pub fn with_params<'a>(params: Bm25Params, texts: impl IntoIterator<Item = &'a str>) -> Self {
		let mut index = Self { params, ..Self::default() };
		for (ordinal, text) in texts.into_iter().enumerate() {
			let terms = analyze(text);
			let mut tfs: HashMap<String, u32> = HashMap::new();
			for term in &terms { *tfs.entry(term.clone()).or_default() += 1; }
			let ordinal = u32::try_from(ordinal).unwrap_or(u32::MAX);
			for (term, tf) in tfs {
				index.postings.entry(term).or_default().push(Posting { ordinal, tf });
			}
			let len = u32::try_from(terms.len()).unwrap_or(u32::MAX);
			index.doc_lens.push(len);
			index.total_len += u64::from(len);
		}
		debug!(docs = index.doc_lens.len(), terms = index.postings.len(), "built sparse index");
		index
	}

	pub fn params(&self) -> Bm25Params { self.params }

	/// Number of indexed documents.
	pub fn len(&self) -> usize { self.doc_lens.len() }

	pub fn is_empty(&self) -> bool { self.doc_lens.is_empty() }

	pub fn term_count(&self) -> usize { self.postings.len() }

	pub fn document_frequency(&self, term: &str) -> usize {
		self.postings.get(term).map_or(0, Vec::len)
	}

	pub fn avg_doc_len(&self) -> f32 {
		if self.doc_lens.is_empty() { 0.0 } else { self.total_len as f32 / self.doc_lens.len() as f32 }
	}

	pub fn idf(&self, term: &str) -> f32 {
		let df = self.document_frequency(term);
		if df == 0 {
			return 0.0;
		}
		let n = self.len() as f32;
		let df = df as f32;
		(1.0 + ((n - df + 0.5) / (df + 0.5)).max(0.0)).ln()
	}

	/// Score every document against `query` and return the best `k` as
	/// `(ordinal, score)`, highest first. Equal scores keep build order.
	/// Documents with no matching term are included with score 0.
	pub fn search(&self, query: &str, k: usize) -> Vec<(usize, f32)> {
		if k == 0 || self.is_empty() {
			return vec![];
		}
		let Bm25Params { k1, b } = self.params;
		// Empty chunks would otherwise make the length ratio undefined.
		let avgdl = self.avg_doc_len().max(1.0);
		let mut scores = vec![0.0f32; self.len()];
		// Repeated query terms contribute once per occurrence.
		for term in analyze(query) {
			let Some(postings) = self.postings.get(&term) else { continue };
			let idf = self.idf(&term);
			for p in postings {
				let tf = p.tf as f32;
				let dl = self.doc_lens[p.ordinal as usize] as f32;
				scores[p.ordinal as usize] += idf * tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * dl / avgdl));
			}
		}
		let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
		ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
		ranked.truncate(k);
		ranked
	}

	/// Structural check for an index that came back from storage.
	pub fn validate(&self) -> Result<()> {
		let n = self.doc_lens.len();
		let total: u64 = self.doc_lens.iter().map(|&l| u64::from(l)).sum();
		if total != self.total_len {
			return Err(Error::Persistence(format!("sparse index length total {} does not match {}", self.total_len, total)));
		}
		for (term, postings) in &self.postings {
			if postings.is_empty() || postings.iter().any(|p| p.tf == 0 || p.ordinal as usize >= n) {
				return Err(Error::Persistence(format!("sparse index has a malformed posting list for '{term}'")));
			}
		}
		Ok(())
	}
}
