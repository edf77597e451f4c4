use serde::{Deserialize, Serialize};

use super::prediction_input::{Goal, GoalKind};

/// Where forbidden trailing characters are kept out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionScope {
	/// Only when the character would be the last one of the output.
	#[default]
	Final,
	/// Wherever the character is generated.
	Everywhere,
}

/// Character classes used to detect progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopPolicy {
	/// Characters ending a word.
	pub word_separators: String,
	/// Characters ending a sentence.
	pub sentence_terminators: String,
	/// Characters that must not end the output.
	pub forbidden_trailing: String,
	pub suppression: SuppressionScope,
}

impl Default for StopPolicy {
	fn default() -> Self {
		Self {
			word_separators: " \n".to_owned(),
			sentence_terminators: ".!?".to_owned(),
			forbidden_trailing: ",;:-".to_owned(),
			suppression: SuppressionScope::Final,
		}
	}
}

impl StopPolicy {
	/// Characters that end one unit of `kind`. Empty for character goals.
	fn boundaries(&self, kind: GoalKind) -> &str {
		match kind {
			GoalKind::WordCount => &self.word_separators,
			GoalKind::SentenceCount => &self.sentence_terminators,
			GoalKind::CharCount => "",
		}
	}
}

/// Tracks progress of one generation toward its [`Goal`].
///
/// Word and sentence goals count boundary crossings: a boundary character
/// seen while inside a unit. Consecutive boundary characters count once, and
/// a boundary as the very first generated symbol never counts.
#[derive(Debug, Clone)]
pub struct StopConditionEvaluator<'a> {
	goal: Goal,
	policy: &'a StopPolicy,
	inside_unit: bool,
	progress: usize,
	observed: usize,
}

impl<'a> StopConditionEvaluator<'a> {
	/// Creates an evaluator for text continuing `seed`.
	///
	/// Generation starts inside a unit when the seed ends in the middle of one,
	/// so the first boundary after some generated text completes it.
	pub fn new(goal: Goal, policy: &'a StopPolicy, seed: &str) -> Self {
		let inside_unit = seed.chars().last().is_some_and(|c| !policy.boundaries(goal.kind).contains(c));
		Self::with_state(goal, policy, inside_unit)
	}

	/// Creates an evaluator with an explicit starting state.
	pub fn with_state(goal: Goal, policy: &'a StopPolicy, inside_unit: bool) -> Self {
		Self { goal, policy, inside_unit, progress: 0, observed: 0 }
	}

	/// Units completed so far.
	pub fn progress(&self) -> usize {
		self.progress
	}

	pub fn is_satisfied(&self) -> bool {
		self.progress >= self.goal.count
	}

	/// Records one generated symbol.
	///
	/// `last_step` tells whether the hard cap ends generation on this symbol.
	/// Returns whether the symbol belongs in the output: a forbidden trailing
	/// character that ends the output is consumed but dropped.
	pub fn observe(&mut self, symbol: char, last_step: bool) -> bool {
		let first = self.observed == 0;
		self.observed += 1;

		match self.goal.kind {
			GoalKind::CharCount => self.progress += 1,
			kind => {
				if self.policy.boundaries(kind).contains(symbol) {
					// The first generated symbol never closes a unit.
					if self.inside_unit && !first {
						self.progress += 1;
						self.inside_unit = false;
					}
				} else {
					self.inside_unit = true;
				}
			}
		}

		if !self.policy.forbidden_trailing.contains(symbol) {
			return true;
		}
		match self.policy.suppression {
			SuppressionScope::Everywhere => false,
			SuppressionScope::Final => !(self.is_satisfied() || last_step),
		}
	}
}
