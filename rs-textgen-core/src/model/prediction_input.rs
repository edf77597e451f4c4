use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Where the generation window is seeded from.
///
/// # Variants
/// - `Custom(String)`: start fresh from the given text.
/// - `Continue`: resume from the session's continuity buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartSeed {
	Custom(String),
	Continue,
}

/// Unit counted toward a [`Goal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
	WordCount,
	SentenceCount,
	CharCount,
}

/// How much text a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
	pub kind: GoalKind,
	pub count: usize,
}

impl Goal {
	pub fn words(count: usize) -> Self {
		Self { kind: GoalKind::WordCount, count }
	}

	pub fn sentences(count: usize) -> Self {
		Self { kind: GoalKind::SentenceCount, count }
	}

	pub fn chars(count: usize) -> Self {
		Self { kind: GoalKind::CharCount, count }
	}
}

/// One generation request. Built once, never mutated.
///
/// The temperature and the source are captured at construction, so changing
/// the engine settings later does not affect a request already in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
	start_seed: StartSeed,
	goal: Goal,
	temperature: f32,
	source_id: String,
	load_timeout: Duration,
}

impl GenerationRequest {
	pub fn new(start_seed: StartSeed, goal: Goal, temperature: f32, source_id: &str, load_timeout: Duration) -> Self {
		Self { start_seed, goal, temperature, source_id: source_id.to_owned(), load_timeout }
	}

	pub fn start_seed(&self) -> &StartSeed {
		&self.start_seed
	}

	pub fn goal(&self) -> Goal {
		self.goal
	}

	pub fn temperature(&self) -> f32 {
		self.temperature
	}

	pub fn source_id(&self) -> &str {
		&self.source_id
	}

	/// Upper bound for acquiring the scoring model.
	pub fn load_timeout(&self) -> Duration {
		self.load_timeout
	}
}

/// Why a generation loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
	GoalMet,
	HardCap,
}

/// Output of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
	/// Generated text, seed excluded. Never longer than the hard length cap.
	pub text: String,
	pub stop_reason: StopReason,
	/// Symbols drawn from the oracle, excluded ones included.
	pub symbols_consumed: usize,
}

/// Tagged outcome handed to the host instead of an error.
///
/// Serialized as `{"status": "ok", ...}` or `{"status": "error", ...}` so a
/// caller can render `fallback` rather than failing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
	Ok { text: String, stop_reason: StopReason },
	Error { kind: String, message: String, fallback: String },
}

impl GenerationOutcome {
	/// Text to display: the generated text or the fallback message.
	pub fn display_text(&self) -> &str {
		match self {
			GenerationOutcome::Ok { text, .. } => text,
			GenerationOutcome::Error { fallback, .. } => fallback,
		}
	}

	pub fn is_ok(&self) -> bool {
		matches!(self, GenerationOutcome::Ok { .. })
	}

	/// Maps an error to a short message suitable for display.
	fn fallback_for(error: &GenerationError) -> &'static str {
		match error {
			GenerationError::Encoding { .. } => "I don't know some of those letters.",
			GenerationError::OracleUnavailable { .. } => "The text model could not be loaded.",
			GenerationError::EmptyCandidateSet | GenerationError::InvalidCandidate { .. } => {
				"The text model had nothing to say."
			}
			GenerationError::Cancelled => "",
		}
	}
}

impl From<Result<GenerationResult, GenerationError>> for GenerationOutcome {
	fn from(result: Result<GenerationResult, GenerationError>) -> Self {
		match result {
			Ok(result) => GenerationOutcome::Ok { text: result.text, stop_reason: result.stop_reason },
			Err(error) => GenerationOutcome::Error {
				kind: error.kind().to_owned(),
				message: error.to_string(),
				fallback: Self::fallback_for(&error).to_owned(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn outcome_is_tagged() {
		let ok = GenerationOutcome::from(Ok(GenerationResult {
			text: "hi ".to_owned(),
			stop_reason: StopReason::GoalMet,
			symbols_consumed: 3,
		}));
		let json = serde_json::to_value(&ok).unwrap();
		assert_eq!(json["status"], "ok");
		assert_eq!(json["text"], "hi ");
		assert_eq!(json["stop_reason"], "goal_met");
		assert_eq!(ok.display_text(), "hi ");
	}

	#[test]
	fn errors_carry_a_fallback() {
		let outcome = GenerationOutcome::from(Err(GenerationError::Encoding { character: 'é', position: 2 }));
		assert!(!outcome.is_ok());
		let json = serde_json::to_value(&outcome).unwrap();
		assert_eq!(json["status"], "error");
		assert_eq!(json["kind"], "encoding");
		assert_eq!(outcome.display_text(), "I don't know some of those letters.");
	}

	#[test]
	fn goal_kinds_serialize_in_snake_case() {
		let goal: Goal = serde_json::from_str(r#"{"kind": "sentence_count", "count": 2}"#).unwrap();
		assert_eq!(goal, Goal::sentences(2));
	}
}
