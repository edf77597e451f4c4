//! Character-level text continuation library.
//!
//! This crate turns a seed string and a "craziness" (temperature) setting into
//! generated text, including:
//! - A fixed symbol vocabulary and a sliding context window
//! - Temperature-controlled sampling over a scoring model's top candidates
//! - Word, sentence and character goals with a hard length cap
//! - A generation session remembering where the last text ended
//! - Memoized, asynchronous scoring model acquisition
//! - A character n-gram scoring model learned from plain-text corpora

/// Generation engine: vocabulary, window, sampling, stop conditions and session.
pub mod model;

/// Scoring oracle trait, oracle cache and the n-gram oracle.
pub mod oracle;

/// Engine configuration (JSON file, every field defaulted).
pub mod config;

/// Error types.
pub mod error;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use config::{CorpusConfig, EngineConfig};
pub use error::{ConfigError, GenerationError, OracleError, VocabularyError};
pub use model::generator::{Generator, SessionState};
pub use model::prediction_input::{
	GenerationOutcome, GenerationRequest, GenerationResult, Goal, GoalKind, StartSeed, StopReason,
};
pub use oracle::{Candidate, CandidateSet, OracleCache, OracleLoader, ScoringOracle};
pub use tokio_util::sync::CancellationToken;
