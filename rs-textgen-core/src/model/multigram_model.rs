use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::io::{build_output_path, is_newer, read_file};
use super::ngram_model::NGramModel;

/// Character n-gram tables of every order from 1 to `max_order`.
///
/// This struct manages:
/// - `ngrams`: a map from n-gram order to its corresponding `NGramModel`.
/// - `max_order`: the longest order learned.
///
/// Scoring backs off from the longest order to shorter ones until a table
/// knows the current prefix.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MultiGramModel {
	max_order: usize,
	ngrams: BTreeMap<usize, NGramModel>,
}

impl MultiGramModel {
	/// Returns an empty model learning orders `1..=max_order`.
	///
	/// # Errors
	/// Returns an error if `max_order` is 0.
	pub fn empty(max_order: usize) -> Result<Self, OracleError> {
		if max_order == 0 {
			return Err(OracleError::Model("max_order must be >= 1".to_owned()));
		}
		let ngrams = (1..=max_order).map(|n| Ok((n, NGramModel::new(n)?))).collect::<Result<_, OracleError>>()?;
		Ok(Self { max_order, ngrams })
	}

	/// Loads a model for the corpus at `filepath`.
	///
	/// - Uses the `postcard` binary next to the corpus (`<name>.bin`) when it is
	///   at least as recent as the corpus and was built with the same `max_order`.
	/// - Otherwise builds the model with `read_database_file` and refreshes the binary.
	pub fn new<P: AsRef<Path>>(filepath: P, max_order: usize) -> Result<Self, OracleError> {
		let filepath = filepath.as_ref();
		let binary_data_path = build_output_path(filepath, "bin")?;

		if binary_data_path.exists() && !is_newer(filepath, &binary_data_path)? {
			let bytes = std::fs::read(&binary_data_path)?;
			match postcard::from_bytes::<Self>(&bytes) {
				Ok(model) if model.max_order == max_order => {
					debug!("Loaded cached model {}", binary_data_path.display());
					return Ok(model);
				}
				Ok(model) => info!(
					"Cached model {} has order {}, rebuilding with order {max_order}",
					binary_data_path.display(),
					model.max_order
				),
				Err(e) => warn!("Ignoring unreadable cache {}: {e}", binary_data_path.display()),
			}
		}

		Self::read_database_file(filepath, &binary_data_path, max_order)
	}

	pub fn max_order(&self) -> usize {
		self.max_order
	}

	/// Reads a corpus, splits its lines into chunks, learns partial models in
	/// parallel, merges them and serializes the result.
	///
	/// # Behavior
	/// - Splits input lines into chunks (based on CPU cores * factor).
	/// - Spawns threads to build partial models for each chunk.
	/// - Merges all partial models sequentially.
	/// - Serializes the final model to `binary_data_path` for future fast loading.
	fn read_database_file(filename: &Path, binary_data_path: &Path, max_order: usize) -> Result<Self, OracleError> {
		let lines = read_file(filename)?;
		let chunks = num_cpus::get() * 8;
		let chunk_size = lines.len().div_ceil(chunks).max(1);
		info!("Learning {} lines from {} (order {max_order})", lines.len(), filename.display());

		let (tx, rx) = mpsc::channel();
		for chunk in lines.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();

			thread::spawn(move || {
				let partial_model = Self::empty(max_order).map(|mut model| {
					for sentence in &chunk {
						model.add_sentence(sentence);
					}
					model
				});
				// The receiver outlives every sender.
				let _ = tx.send(partial_model);
			});
		}
		drop(tx);

		let mut final_model = Self::empty(max_order)?;
		for partial_model in rx.iter() {
			final_model.merge(&partial_model?)?;
		}

		let bytes = postcard::to_stdvec(&final_model)?;
		std::fs::write(binary_data_path, bytes)?;

		Ok(final_model)
	}

	/// Learns one corpus line, followed by a newline.
	pub fn add_sentence(&mut self, sentence: &str) {
		let mut line = String::with_capacity(sentence.len() + 1);
		line.push_str(sentence);
		line.push('\n');

		for model in self.ngrams.values_mut() {
			model.add_sentence(&line);
		}
	}

	/// Top `k` continuations of `context`, from the longest order that knows it.
	///
	/// Returns an empty list only when nothing was learned at all.
	pub fn candidates(&self, context: &str, k: usize) -> Vec<(char, f32)> {
		let context: Vec<char> = context.chars().collect();
		self.ngrams
			.values()
			.rev()
			.find_map(|model| model.candidates(&context, k))
			.unwrap_or_default()
	}

	/// Merges another model into this one.
	///
	/// # Errors
	/// Returns an error if the orders do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), OracleError> {
		if self.max_order != other.max_order {
			return Err(OracleError::Model(format!(
				"max order mismatch: self={}, other={}",
				self.max_order, other.max_order
			)));
		}

		for (n, model) in &other.ngrams {
			if let Some(existing) = self.ngrams.get_mut(n) {
				existing.merge(model)?;
			} else {
				self.ngrams.insert(*n, model.clone());
			}
		}

		Ok(())
	}
}
