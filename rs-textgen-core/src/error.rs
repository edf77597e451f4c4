use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised when translating between characters and symbol indices.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VocabularyError {
	/// The character is not part of the alphabet.
	#[error("character {0:?} is not part of the vocabulary")]
	UnknownSymbol(char),
	/// The index does not name a symbol (`index >= len`).
	#[error("symbol index {index} is out of range for a vocabulary of {len} symbols")]
	IndexOutOfRange { index: usize, len: usize },
	/// The same character appears twice in the alphabet.
	#[error("character {0:?} appears more than once in the alphabet")]
	DuplicateSymbol(char),
}

/// Errors raised by scoring oracles and their loaders.
#[derive(Error, Debug)]
pub enum OracleError {
	/// No model is registered under this source id.
	#[error("unknown source {0:?}")]
	UnknownSource(String),
	/// Loading did not finish within the caller-supplied timeout.
	#[error("loading timed out after {0:?}")]
	Timeout(Duration),
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	/// The cached binary model could not be (de)serialized.
	#[error("model serialization failed: {0}")]
	Serialization(#[from] postcard::Error),
	/// The model could not be built or queried.
	#[error("model error: {0}")]
	Model(String),
}

/// Errors surfaced by a generation request.
///
/// Each variant maps to one of the failure kinds the host can render, see
/// [`GenerationError::kind`].
#[derive(Error, Debug)]
pub enum GenerationError {
	/// The seed (or the continuity buffer) contains a character outside the vocabulary.
	#[error("cannot encode character {character:?} at position {position}")]
	Encoding { character: char, position: usize },
	/// The scoring model could not be acquired or failed while scoring.
	#[error("scoring model for source {source_id:?} is unavailable: {reason}")]
	OracleUnavailable {
		source_id: String,
		#[source]
		reason: OracleError,
	},
	/// The scoring model returned zero candidates.
	#[error("the scoring model returned no candidates")]
	EmptyCandidateSet,
	/// The scoring model proposed an index that is not a vocabulary symbol.
	#[error("the scoring model proposed symbol index {index}, outside the vocabulary")]
	InvalidCandidate { index: usize },
	/// The caller abandoned the request.
	#[error("generation was cancelled")]
	Cancelled,
}

impl GenerationError {
	/// Stable machine-readable name of the failure kind.
	pub fn kind(&self) -> &'static str {
		match self {
			GenerationError::Encoding { .. } => "encoding",
			GenerationError::OracleUnavailable { .. } => "oracle_unavailable",
			GenerationError::EmptyCandidateSet => "empty_candidate_set",
			GenerationError::InvalidCandidate { .. } => "invalid_candidate",
			GenerationError::Cancelled => "cancelled",
		}
	}
}

/// Errors raised while reading or validating an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("cannot read config file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("cannot parse config file {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
	#[error("invalid vocabulary: {0}")]
	Vocabulary(#[from] VocabularyError),
	/// A numeric setting is outside its allowed range.
	#[error("invalid setting `{field}`: {reason}")]
	Invalid { field: &'static str, reason: String },
}
