//! Scoring oracles: the models that propose the next symbol.
//!
//! An oracle is opaque to the engine. It receives a [`ContextWindow`] and answers
//! with a ranked [`CandidateSet`]. Oracles are produced by an [`OracleLoader`]
//! and shared through an [`OracleCache`].

use std::future::Future;

use serde::Serialize;

use crate::error::OracleError;
use crate::model::window::ContextWindow;

/// Memoized, per-source oracle acquisition.
pub mod cache;

/// Character n-gram oracle built from plain-text corpora.
pub mod ngram;

pub use cache::OracleCache;

/// One proposed next symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate {
	/// Vocabulary index of the proposed symbol.
	pub index: usize,
	/// Score of the symbol. Not necessarily normalized.
	pub probability: f32,
}

/// Top-K candidates returned by an oracle for one window state, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateSet {
	candidates: Vec<Candidate>,
}

impl CandidateSet {
	pub fn new(candidates: Vec<Candidate>) -> Self {
		Self { candidates }
	}

	pub fn len(&self) -> usize {
		self.candidates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.candidates.is_empty()
	}

	/// Keeps at most `k` candidates.
	pub fn truncate(&mut self, k: usize) {
		self.candidates.truncate(k);
	}

	pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
		self.candidates.iter()
	}

	pub fn as_slice(&self) -> &[Candidate] {
		&self.candidates
	}
}

impl From<Vec<(usize, f32)>> for CandidateSet {
	fn from(pairs: Vec<(usize, f32)>) -> Self {
		Self::new(pairs.into_iter().map(|(index, probability)| Candidate { index, probability }).collect())
	}
}

/// A model scoring the next symbol.
///
/// Implementations are shared read-only between requests, so scoring must not
/// mutate observable state.
pub trait ScoringOracle: Send + Sync + 'static {
	/// Width of the window the model expects.
	fn window_width(&self) -> usize;

	/// Returns at most `max_candidates` candidates for the next symbol.
	fn score(
		&self,
		window: &ContextWindow,
		max_candidates: usize,
	) -> impl Future<Output = Result<CandidateSet, OracleError>> + Send;
}

/// Builds oracles from a source identifier.
pub trait OracleLoader: Send + Sync + 'static {
	type Oracle: ScoringOracle;

	/// Loads the model registered under `source_id`.
	fn load(&self, source_id: &str) -> impl Future<Output = Result<Self::Oracle, OracleError>> + Send;
}
