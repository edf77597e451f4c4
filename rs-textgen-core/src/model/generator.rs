use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::{ConfigError, GenerationError};
use crate::oracle::ngram::NGramLoader;
use crate::oracle::{OracleCache, OracleLoader, ScoringOracle};
use super::prediction_input::{
	GenerationOutcome, GenerationRequest, GenerationResult, Goal, StartSeed, StopReason,
};
use super::sampling::SamplingPolicy;
use super::stop_condition::StopConditionEvaluator;
use super::vocabulary::SymbolVocabulary;
use super::window::ContextWindow;

/// Observable phase of a generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	Idle,
	LoadingOracle,
	Generating,
}

/// State shared by consecutive requests. Guarded by the request queue.
struct Session {
	/// Trailing characters of the last completed generation.
	continuity: String,
	rng: Box<dyn RngCore + Send>,
}

/// Sets the observable state while a request runs and resets it to `Idle`
/// on every exit path, early returns and dropped futures included.
struct StateGuard<'a> {
	state: &'a Mutex<SessionState>,
}

impl<'a> StateGuard<'a> {
	fn enter(state: &'a Mutex<SessionState>, phase: SessionState) -> Self {
		let guard = Self { state };
		guard.set(phase);
		guard
	}

	fn set(&self, phase: SessionState) {
		*self.state.lock().unwrap_or_else(PoisonError::into_inner) = phase;
	}
}

impl Drop for StateGuard<'_> {
	fn drop(&mut self) {
		self.set(SessionState::Idle);
	}
}

/// Text continuation engine for one extension instance.
///
/// # Responsibilities
/// - Hold the user settings (temperature, source)
/// - Serve generation requests strictly in arrival order
/// - Acquire scoring models through a shared [`OracleCache`]
/// - Remember the end of the last generation for continuation requests
pub struct Generator<L: OracleLoader> {
	config: EngineConfig,
	vocabulary: Arc<SymbolVocabulary>,
	oracles: Arc<OracleCache<L>>,
	sampling: SamplingPolicy,
	temperature: Mutex<f32>,
	source: RwLock<String>,
	/// Fair lock: waiting requests are served first come, first served.
	session: tokio::sync::Mutex<Session>,
	state: Mutex<SessionState>,
}

impl Generator<NGramLoader> {
	/// Creates a generator backed by n-gram oracles built from the configured corpora.
	///
	/// # Errors
	/// Returns an error if the configuration is invalid.
	pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
		config.validate()?;
		let vocabulary = Arc::new(config.vocabulary()?);
		let loader = NGramLoader::new(&config, Arc::clone(&vocabulary));
		Ok(Self::assemble(config, vocabulary, Arc::new(OracleCache::new(loader))))
	}
}

impl<L: OracleLoader> Generator<L> {
	/// Creates a generator using `oracles`, which may be shared with other generators.
	///
	/// # Errors
	/// Returns an error if the configuration is invalid.
	pub fn new(config: EngineConfig, oracles: Arc<OracleCache<L>>) -> Result<Self, ConfigError> {
		config.validate()?;
		let vocabulary = Arc::new(config.vocabulary()?);
		Ok(Self::assemble(config, vocabulary, oracles))
	}

	fn assemble(config: EngineConfig, vocabulary: Arc<SymbolVocabulary>, oracles: Arc<OracleCache<L>>) -> Self {
		let sampling = SamplingPolicy::new(config.max_temperature, config.exponent_scale);
		let rng = match config.rng_seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		};

		Self {
			temperature: Mutex::new(sampling.clamp(config.default_temperature)),
			source: RwLock::new(config.default_source.clone()),
			session: tokio::sync::Mutex::new(Session { continuity: String::new(), rng: Box::new(rng) }),
			state: Mutex::new(SessionState::Idle),
			sampling,
			vocabulary,
			oracles,
			config,
		}
	}

	/// Replaces the random source used for sampling.
	pub fn with_rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
		self.session.get_mut().rng = Box::new(rng);
		self
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn vocabulary(&self) -> &Arc<SymbolVocabulary> {
		&self.vocabulary
	}

	pub fn oracles(&self) -> &Arc<OracleCache<L>> {
		&self.oracles
	}

	/// Stores `value` clamped into `[0, max_temperature]`.
	pub fn set_temperature(&self, value: f32) {
		*self.temperature.lock().unwrap_or_else(PoisonError::into_inner) = self.sampling.clamp(value);
	}

	pub fn temperature(&self) -> f32 {
		*self.temperature.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Selects the source used by subsequent requests. Requests already built keep theirs.
	pub fn set_source(&self, source_id: &str) {
		*self.source.write().unwrap_or_else(PoisonError::into_inner) = source_id.to_owned();
	}

	pub fn source(&self) -> String {
		self.source.read().unwrap_or_else(PoisonError::into_inner).clone()
	}

	pub fn state(&self) -> SessionState {
		*self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Current continuity buffer. Waits for the in-flight request, if any.
	pub async fn continuity(&self) -> String {
		self.session.lock().await.continuity.clone()
	}

	/// Builds a request from the current temperature and source.
	pub fn request(&self, start_seed: StartSeed, goal: Goal) -> GenerationRequest {
		GenerationRequest::new(start_seed, goal, self.temperature(), &self.source(), self.config.load_timeout())
	}

	/// Runs one generation request.
	///
	/// Requests wait for the ones submitted before them. On success the
	/// continuity buffer becomes the last `continuity_buffer_size` characters
	/// of seed + generated text. On any error, cancellation or drop of the
	/// returned future, the buffer is left untouched.
	///
	/// # Errors
	/// - `Encoding` if the seed has characters outside the vocabulary
	/// - `OracleUnavailable` if the model cannot be loaded in time or fails to score
	/// - `EmptyCandidateSet` / `InvalidCandidate` if the model misbehaves
	/// - `Cancelled` if `cancel` fires before completion
	pub async fn generate_continuation(
		&self,
		request: &GenerationRequest,
		cancel: &CancellationToken,
	) -> Result<GenerationResult, GenerationError> {
		let mut session = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(GenerationError::Cancelled),
			session = self.session.lock() => session,
		};

		let state = StateGuard::enter(&self.state, SessionState::LoadingOracle);
		let oracle = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(GenerationError::Cancelled),
			oracle = self.oracles.acquire(request.source_id(), request.load_timeout()) => oracle?,
		};
		state.set(SessionState::Generating);

		let seed = match request.start_seed() {
			StartSeed::Custom(text) => text.clone(),
			StartSeed::Continue => session.continuity.clone(),
		};
		let mut window = ContextWindow::seed(&self.vocabulary, &seed, oracle.window_width())?;
		let mut evaluator = StopConditionEvaluator::new(request.goal(), &self.config.stop, &seed);
		debug!("Generating {:?} from {seed:?} with source {:?}", request.goal(), request.source_id());

		let cap = self.config.hard_length_cap;
		let max_candidates = self.config.max_candidates;
		let mut text = String::new();
		let mut consumed = 0;

		while !evaluator.is_satisfied() && consumed < cap {
			let mut candidates = tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(GenerationError::Cancelled),
				scored = oracle.score(&window, max_candidates) => scored.map_err(|reason| {
					GenerationError::OracleUnavailable { source_id: request.source_id().to_owned(), reason }
				})?,
			};
			candidates.truncate(max_candidates);

			let index = self.sampling.choose(&candidates, request.temperature(), session.rng.as_mut())?;
			let symbol = self.vocabulary.decode(index).map_err(|_| GenerationError::InvalidCandidate { index })?;
			window.slide(index);
			consumed += 1;

			if self.vocabulary.is_filler(index) {
				continue;
			}
			if evaluator.observe(symbol, consumed == cap) {
				text.push(symbol);
			}
		}

		let stop_reason = if evaluator.is_satisfied() { StopReason::GoalMet } else { StopReason::HardCap };
		session.continuity = last_n_chars(&format!("{seed}{text}"), self.config.continuity_buffer_size);
		info!("Generated {} characters ({stop_reason:?}, {consumed} symbols consumed)", text.chars().count());

		Ok(GenerationResult { text, stop_reason, symbols_consumed: consumed })
	}

	/// `count` words starting with `seed`. The outcome text includes the seed.
	pub async fn words(&self, seed: &str, count: usize, cancel: &CancellationToken) -> GenerationOutcome {
		let request = self.request(StartSeed::Custom(seed.to_owned()), Goal::words(count));
		let result = self.generate_continuation(&request, cancel).await.map(|mut result| {
			result.text.insert_str(0, seed);
			result
		});
		GenerationOutcome::from(result)
	}

	/// `count` characters continuing `seed`. The outcome text excludes the seed.
	pub async fn characters(&self, seed: &str, count: usize, cancel: &CancellationToken) -> GenerationOutcome {
		let request = self.request(StartSeed::Custom(seed.to_owned()), Goal::chars(count));
		GenerationOutcome::from(self.generate_continuation(&request, cancel).await)
	}

	/// The next word after the previously generated text.
	pub async fn next_word(&self, cancel: &CancellationToken) -> GenerationOutcome {
		let request = self.request(StartSeed::Continue, Goal::words(1));
		GenerationOutcome::from(self.generate_continuation(&request, cancel).await)
	}

	/// The next sentence after the previously generated text.
	pub async fn next_sentence(&self, cancel: &CancellationToken) -> GenerationOutcome {
		let request = self.request(StartSeed::Continue, Goal::sentences(1));
		GenerationOutcome::from(self.generate_continuation(&request, cancel).await)
	}
}

/// Returns the last `n` characters of a string.
///
/// If `n` is greater than the number of characters in `s`, the entire string is returned.
fn last_n_chars(s: &str, n: usize) -> String {
	let len = s.chars().count();
	s.chars().skip(len.saturating_sub(n)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn last_n_chars_keeps_the_tail() {
		assert_eq!(last_n_chars("hello world", 5), "world");
		assert_eq!(last_n_chars("hi", 5), "hi");
		assert_eq!(last_n_chars("hi", 0), "");
	}

	#[test]
	fn state_guard_resets_to_idle() {
		let state = Mutex::new(SessionState::Idle);
		{
			let guard = StateGuard::enter(&state, SessionState::LoadingOracle);
			assert_eq!(*state.lock().unwrap(), SessionState::LoadingOracle);
			guard.set(SessionState::Generating);
			assert_eq!(*state.lock().unwrap(), SessionState::Generating);
		}
		assert_eq!(*state.lock().unwrap(), SessionState::Idle);
	}
}
