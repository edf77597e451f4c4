use std::collections::HashMap;

use crate::error::VocabularyError;

/// Characters recognized by the bundled scoring models.
pub const DEFAULT_ALPHABET: &str =
	"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz1234567890 \n.,;:!?'\"-()/";

/// Padding symbol placed in front of short seeds. Never part of generated text.
pub const DEFAULT_FILLER: char = '*';

/// Fixed, ordered alphabet of symbols.
///
/// Every character has a unique index in `0..len()`. The filler symbol is always
/// the last index.
///
/// # Invariants
/// - Characters are unique
/// - The filler is not part of the alphabet proper
/// - The vocabulary never changes after construction
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolVocabulary {
	symbols: Vec<char>,
	indices: HashMap<char, usize>,
}

impl SymbolVocabulary {
	/// Builds a vocabulary from an alphabet and a filler symbol.
	///
	/// # Errors
	/// Returns an error if a character (filler included) appears twice.
	pub fn new(alphabet: &str, filler: char) -> Result<Self, VocabularyError> {
		let mut symbols = Vec::with_capacity(alphabet.len() + 1);
		let mut indices = HashMap::with_capacity(alphabet.len() + 1);

		for c in alphabet.chars().chain(std::iter::once(filler)) {
			if indices.insert(c, symbols.len()).is_some() {
				return Err(VocabularyError::DuplicateSymbol(c));
			}
			symbols.push(c);
		}

		Ok(Self { symbols, indices })
	}

	/// Number of symbols, filler included.
	pub fn len(&self) -> usize {
		self.symbols.len()
	}

	/// Always false: the filler is always present.
	pub fn is_empty(&self) -> bool {
		self.symbols.is_empty()
	}

	/// Index of the filler symbol.
	pub fn filler_index(&self) -> usize {
		self.symbols.len() - 1
	}

	pub fn filler(&self) -> char {
		self.symbols[self.filler_index()]
	}

	pub fn is_filler(&self, index: usize) -> bool {
		index == self.filler_index()
	}

	/// Returns the index of `c`.
	///
	/// # Errors
	/// `UnknownSymbol` if `c` is not in the vocabulary.
	pub fn encode(&self, c: char) -> Result<usize, VocabularyError> {
		self.indices.get(&c).copied().ok_or(VocabularyError::UnknownSymbol(c))
	}

	/// Returns the character at `index`.
	///
	/// # Errors
	/// `IndexOutOfRange` if `index >= len()`.
	pub fn decode(&self, index: usize) -> Result<char, VocabularyError> {
		self.symbols
			.get(index)
			.copied()
			.ok_or(VocabularyError::IndexOutOfRange { index, len: self.symbols.len() })
	}

	/// One-hot vector of length `len()` with a single `1.0` at `index`.
	///
	/// # Errors
	/// `IndexOutOfRange` if `index >= len()`.
	pub fn one_hot(&self, index: usize) -> Result<Vec<f32>, VocabularyError> {
		if index >= self.symbols.len() {
			return Err(VocabularyError::IndexOutOfRange { index, len: self.symbols.len() });
		}
		let mut vector = vec![0.0; self.symbols.len()];
		vector[index] = 1.0;
		Ok(vector)
	}
}

impl Default for SymbolVocabulary {
	fn default() -> Self {
		Self {
			symbols: DEFAULT_ALPHABET.chars().chain(std::iter::once(DEFAULT_FILLER)).collect(),
			indices: DEFAULT_ALPHABET
				.chars()
				.chain(std::iter::once(DEFAULT_FILLER))
				.enumerate()
				.map(|(i, c)| (c, i))
				.collect(),
		}
	}
}
