use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use crate::config::{CorpusConfig, EngineConfig};
use crate::error::OracleError;
use crate::io::{get_filename, list_files, normalize_folder};
use crate::model::multigram_model::MultiGramModel;
use crate::model::vocabulary::SymbolVocabulary;
use crate::model::window::ContextWindow;
use super::{Candidate, CandidateSet, OracleLoader, ScoringOracle};

/// Scores windows with character n-gram statistics learned from a corpus.
#[derive(Debug)]
pub struct NGramOracle {
	model: MultiGramModel,
	vocabulary: Arc<SymbolVocabulary>,
	window_width: usize,
}

impl NGramOracle {
	pub fn new(model: MultiGramModel, vocabulary: Arc<SymbolVocabulary>, window_width: usize) -> Self {
		Self { model, vocabulary, window_width }
	}
}

impl ScoringOracle for NGramOracle {
	fn window_width(&self) -> usize {
		self.window_width
	}

	/// Characters the vocabulary does not know are skipped, so fewer than
	/// `max_candidates` may come back.
	async fn score(&self, window: &ContextWindow, max_candidates: usize) -> Result<CandidateSet, OracleError> {
		let context = window.text(&self.vocabulary).map_err(|e| OracleError::Model(e.to_string()))?;
		let candidates = self
			.model
			.candidates(&context, usize::MAX)
			.into_iter()
			.filter_map(|(c, probability)| {
				let index = self.vocabulary.encode(c).ok()?;
				(!self.vocabulary.is_filler(index)).then_some(Candidate { index, probability })
			})
			.take(max_candidates)
			.collect();
		Ok(CandidateSet::new(candidates))
	}
}

/// Loads [`NGramOracle`]s from the corpora described by a [`CorpusConfig`].
///
/// A source id resolves to the file registered in `sources`, or else to
/// `<folder>/<id>.dat`.
#[derive(Debug, Clone)]
pub struct NGramLoader {
	corpus: CorpusConfig,
	vocabulary: Arc<SymbolVocabulary>,
	window_width: usize,
}

impl NGramLoader {
	pub fn new(config: &EngineConfig, vocabulary: Arc<SymbolVocabulary>) -> Self {
		Self { corpus: config.corpus.clone(), vocabulary, window_width: config.window_width }
	}

	/// Corpus file for `source_id`.
	///
	/// # Errors
	/// `UnknownSource` if no corpus matches.
	pub fn resolve(&self, source_id: &str) -> Result<PathBuf, OracleError> {
		let folder = normalize_folder(&self.corpus.folder);

		if let Some(path) = self.corpus.sources.get(source_id) {
			let path = if path.is_absolute() { path.clone() } else { folder.join(path) };
			if path.is_file() {
				return Ok(path);
			}
		}

		let plain_name = !source_id.is_empty() && !source_id.contains(['/', '\\']) && source_id != "..";
		if plain_name {
			let path = folder.join(format!("{source_id}.dat"));
			if path.is_file() {
				return Ok(path);
			}
		}

		Err(OracleError::UnknownSource(source_id.to_owned()))
	}

	/// Every source id that currently resolves to a corpus.
	pub fn sources(&self) -> Result<Vec<String>, OracleError> {
		let folder = normalize_folder(&self.corpus.folder);
		let mut ids: BTreeSet<String> = self
			.corpus
			.sources
			.keys()
			.filter(|id| self.resolve(id).is_ok())
			.cloned()
			.collect();

		for file in list_files(&folder, "dat")? {
			ids.insert(get_filename(&file)?);
		}
		Ok(ids.into_iter().collect())
	}
}

impl OracleLoader for NGramLoader {
	type Oracle = NGramOracle;

	async fn load(&self, source_id: &str) -> Result<NGramOracle, OracleError> {
		let path = self.resolve(source_id)?;
		let max_order = self.corpus.max_order;
		debug!("Source {source_id:?} resolves to {}", path.display());

		let model = tokio::task::spawn_blocking(move || MultiGramModel::new(path, max_order))
			.await
			.map_err(|e| OracleError::Model(format!("model loading task failed: {e}")))??;

		Ok(NGramOracle::new(model, Arc::clone(&self.vocabulary), self.window_width))
	}
}
