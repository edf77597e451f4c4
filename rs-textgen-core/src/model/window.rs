use std::collections::VecDeque;

use crate::error::{GenerationError, VocabularyError};
use super::vocabulary::SymbolVocabulary;

/// Fixed-width sliding window of encoded symbols, used as scoring input.
///
/// # Invariants
/// - `len()` always equals the width given at construction
/// - Every element is a valid index of the vocabulary it was seeded with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
	symbols: VecDeque<usize>,
}

impl ContextWindow {
	/// Builds a window from `text`.
	///
	/// The text is left-padded with the filler symbol up to `width`, then only
	/// its last `width` characters are kept.
	///
	/// # Errors
	/// `GenerationError::Encoding` if any character of `text` is outside the
	/// vocabulary, even one that would have been truncated away.
	pub fn seed(vocabulary: &SymbolVocabulary, text: &str, width: usize) -> Result<Self, GenerationError> {
		let encoded = text
			.chars()
			.enumerate()
			.map(|(position, c)| {
				vocabulary.encode(c).map_err(|_| GenerationError::Encoding { character: c, position })
			})
			.collect::<Result<Vec<usize>, GenerationError>>()?;

		let padding = width.saturating_sub(encoded.len());
		let skip = encoded.len().saturating_sub(width);

		let symbols = std::iter::repeat_n(vocabulary.filler_index(), padding)
			.chain(encoded.into_iter().skip(skip))
			.collect();

		Ok(Self { symbols })
	}

	/// Drops the oldest symbol and appends `next`.
	///
	/// A zero-width window stays empty.
	pub fn slide(&mut self, next: usize) {
		if self.symbols.is_empty() {
			return;
		}
		self.symbols.pop_front();
		self.symbols.push_back(next);
	}

	pub fn width(&self) -> usize {
		self.symbols.len()
	}

	/// Encoded symbols, oldest first.
	pub fn symbols(&self) -> impl Iterator<Item = usize> + '_ {
		self.symbols.iter().copied()
	}

	/// Decoded content with the filler padding removed.
	pub fn text(&self, vocabulary: &SymbolVocabulary) -> Result<String, VocabularyError> {
		self.symbols
			.iter()
			.filter(|&&index| !vocabulary.is_filler(index))
			.map(|&index| vocabulary.decode(index))
			.collect()
	}

	/// One-hot matrix (`width` rows of `vocabulary.len()` columns), for neural scorers.
	pub fn one_hot(&self, vocabulary: &SymbolVocabulary) -> Result<Vec<Vec<f32>>, VocabularyError> {
		self.symbols.iter().map(|&index| vocabulary.one_hot(index)).collect()
	}
}
