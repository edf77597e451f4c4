use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::stop_condition::StopPolicy;
use crate::model::vocabulary::{DEFAULT_ALPHABET, DEFAULT_FILLER, SymbolVocabulary};

/// Engine settings.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```json
/// { "hard_length_cap": 120, "corpus": { "folder": "./data" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Recognized characters, filler excluded.
	pub alphabet: String,
	/// Padding symbol for short seeds.
	pub filler: char,
	/// Window width W used by oracles that do not impose their own.
	pub window_width: usize,
	/// Candidates K kept per scoring call.
	pub max_candidates: usize,
	/// Maximum symbols M consumed by one request.
	pub hard_length_cap: usize,
	/// Characters C remembered for continuation requests.
	pub continuity_buffer_size: usize,
	/// Upper bound K_max of the temperature range `[0, K_max]`.
	pub max_temperature: f32,
	/// Divisor of `K_max - temperature` in the sampling exponent.
	pub exponent_scale: f32,
	pub default_temperature: f32,
	pub default_source: String,
	/// Default upper bound for loading a scoring model, in milliseconds.
	pub load_timeout_ms: u64,
	/// Seed for the sampling random source. Drawn from the OS when absent.
	pub rng_seed: Option<u64>,
	pub stop: StopPolicy,
	pub corpus: CorpusConfig,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			alphabet: DEFAULT_ALPHABET.to_owned(),
			filler: DEFAULT_FILLER,
			window_width: 40,
			max_candidates: 10,
			hard_length_cap: 250,
			continuity_buffer_size: 20,
			max_temperature: 100.0,
			exponent_scale: 10.0,
			default_temperature: 10.0,
			default_source: "Dr. Seuss".to_owned(),
			load_timeout_ms: 30_000,
			rng_seed: None,
			stop: StopPolicy::default(),
			corpus: CorpusConfig::default(),
		}
	}
}

impl EngineConfig {
	/// Reads and validates a JSON config file.
	///
	/// # Errors
	/// Returns an error if the file cannot be read or parsed, or if a value is invalid.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
		let config: Self = serde_json::from_str(&contents)
			.map_err(|source| ConfigError::Parse { path: path.to_owned(), source })?;
		config.validate()?;
		Ok(config)
	}

	/// Checks ranges and builds the vocabulary once to reject duplicates.
	///
	/// # Errors
	/// Returns the first invalid setting found.
	pub fn validate(&self) -> Result<(), ConfigError> {
		fn positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
			if value == 0 {
				return Err(ConfigError::Invalid { field, reason: "must be at least 1".to_owned() });
			}
			Ok(())
		}

		positive("window_width", self.window_width)?;
		positive("max_candidates", self.max_candidates)?;
		positive("hard_length_cap", self.hard_length_cap)?;
		positive("corpus.max_order", self.corpus.max_order)?;

		if !(self.max_temperature.is_finite() && self.max_temperature > 0.0) {
			return Err(ConfigError::Invalid {
				field: "max_temperature",
				reason: format!("must be a positive number, got {}", self.max_temperature),
			});
		}
		if !(self.exponent_scale.is_finite() && self.exponent_scale > 0.0) {
			return Err(ConfigError::Invalid {
				field: "exponent_scale",
				reason: format!("must be a positive number, got {}", self.exponent_scale),
			});
		}

		self.vocabulary()?;
		Ok(())
	}

	/// Builds the symbol vocabulary described by `alphabet` and `filler`.
	pub fn vocabulary(&self) -> Result<SymbolVocabulary, ConfigError> {
		Ok(SymbolVocabulary::new(&self.alphabet, self.filler)?)
	}

	pub fn load_timeout(&self) -> Duration {
		Duration::from_millis(self.load_timeout_ms)
	}
}

/// Where the n-gram oracle finds its corpora.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
	/// Folder holding `<source>.dat` corpora. Relative source paths resolve against it.
	pub folder: PathBuf,
	/// Longest n-gram learned (1 = single character frequencies).
	pub max_order: usize,
	/// Explicit source id to corpus file mapping.
	pub sources: BTreeMap<String, PathBuf>,
}

impl Default for CorpusConfig {
	fn default() -> Self {
		let sources = [
			("Dr. Seuss", "seuss.dat"),
			("Shakespeare", "shakespeare.dat"),
			("jokes", "jokes.dat"),
			("Warriors", "warriorcats.dat"),
			("Moby Dick", "mobydick.dat"),
		]
		.into_iter()
		.map(|(id, file)| (id.to_owned(), PathBuf::from(file)))
		.collect();

		Self { folder: PathBuf::from("./data"), max_order: 8, sources }
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	#[test]
	fn defaults_are_valid() {
		let config = EngineConfig::default();
		config.validate().unwrap();
		assert_eq!(config.vocabulary().unwrap().len(), DEFAULT_ALPHABET.chars().count() + 1);
		assert_eq!(config.load_timeout(), Duration::from_secs(30));
	}

	#[test]
	fn partial_file_keeps_other_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, r#"{{ "hard_length_cap": 120, "stop": {{ "suppression": "everywhere" }} }}"#).unwrap();

		let config = EngineConfig::from_file(file.path()).unwrap();
		assert_eq!(config.hard_length_cap, 120);
		assert_eq!(config.window_width, 40);
		assert_eq!(config.stop.word_separators, " \n");
		assert_eq!(config.stop.suppression, crate::model::stop_condition::SuppressionScope::Everywhere);
	}

	#[test]
	fn invalid_values_are_rejected() {
		let config = EngineConfig { max_candidates: 0, ..EngineConfig::default() };
		assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "max_candidates", .. })));

		let config = EngineConfig { exponent_scale: 0.0, ..EngineConfig::default() };
		assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "exponent_scale", .. })));

		let config = EngineConfig { alphabet: "ab*".to_owned(), ..EngineConfig::default() };
		assert!(matches!(config.validate(), Err(ConfigError::Vocabulary(_))));
	}

	#[test]
	fn missing_file_is_a_read_error() {
		assert!(matches!(EngineConfig::from_file("/nonexistent/textgen.json"), Err(ConfigError::Read { .. })));
	}
}
