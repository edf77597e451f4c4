use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use super::state::State;

/// Fixed-order character n-gram table.
///
/// Stores, for every observed prefix of length `n-1`, the characters that
/// followed it. Order 1 has a single empty prefix and holds plain character
/// frequencies.
///
/// # Invariants
/// - `n` is always >= 1
/// - Each state in `states` corresponds to a unique prefix of length `n-1`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NGramModel {
	n: usize,
	states: HashMap<String, State>,
}

impl NGramModel {
	/// Creates a new n-gram model of order `n`.
	///
	/// # Errors
	/// Returns an error if `n < 1`.
	pub fn new(n: usize) -> Result<Self, OracleError> {
		if n < 1 {
			return Err(OracleError::Model("n must be >= 1".to_owned()));
		}
		Ok(Self { n, states: HashMap::new() })
	}

	/// Learns every n-gram of `sentence`. Sentences shorter than `n` are ignored.
	pub fn add_sentence(&mut self, sentence: &str) {
		let chars: Vec<char> = sentence.chars().collect();
		if chars.len() < self.n {
			return;
		}

		for window in chars.windows(self.n) {
			let (prefix, next) = window.split_at(self.n - 1);
			let prefix: String = prefix.iter().collect();
			let state = self.states.entry(prefix.clone()).or_insert_with(|| State::new(&prefix));
			state.add_transition(next[0]);
		}
	}

	/// Top `k` continuations of the last `n-1` characters of `context`.
	///
	/// Returns `None` if the context is too short or the prefix was never seen.
	pub fn candidates(&self, context: &[char], k: usize) -> Option<Vec<(char, f32)>> {
		let prefix_len = self.n - 1;
		if context.len() < prefix_len {
			return None;
		}
		let key: String = context[context.len() - prefix_len..].iter().collect();
		let top = self.states.get(&key)?.top(k);
		(!top.is_empty()).then_some(top)
	}

	/// Merges another model of the same order into this one.
	///
	/// # Errors
	/// Returns an error if the model orders do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), OracleError> {
		if self.n != other.n {
			return Err(OracleError::Model(format!("order mismatch: {} vs {}", self.n, other.n)));
		}

		for (key, state) in &other.states {
			if let Some(existing) = self.states.get_mut(key) {
				existing.merge(state)?;
			} else {
				self.states.insert(key.clone(), state.clone());
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chars(s: &str) -> Vec<char> {
		s.chars().collect()
	}

	#[test]
	fn order_zero_is_rejected() {
		assert!(NGramModel::new(0).is_err());
	}

	#[test]
	fn trigram_uses_last_two_characters() {
		let mut model = NGramModel::new(3).unwrap();
		model.add_sentence("abcabd");
		let top = model.candidates(&chars("xxab"), 5).unwrap();
		assert_eq!(top, vec![('c', 0.5), ('d', 0.5)]);
		assert!(model.candidates(&chars("zz"), 5).is_none());
		assert!(model.candidates(&chars("b"), 5).is_none());
	}

	#[test]
	fn unigram_ignores_context() {
		let mut model = NGramModel::new(1).unwrap();
		model.add_sentence("aab");
		assert_eq!(model.candidates(&[], 1).unwrap(), vec![('a', 2.0 / 3.0)]);
	}

	#[test]
	fn case_is_preserved() {
		let mut model = NGramModel::new(2).unwrap();
		model.add_sentence("Ab");
		assert!(model.candidates(&chars("a"), 5).is_none());
		assert_eq!(model.candidates(&chars("A"), 5).unwrap(), vec![('b', 1.0)]);
	}

	#[test]
	fn merge_requires_same_order() {
		let mut left = NGramModel::new(2).unwrap();
		left.add_sentence("ab");
		let mut right = NGramModel::new(2).unwrap();
		right.add_sentence("ac");
		left.merge(&right).unwrap();
		assert_eq!(left.candidates(&chars("a"), 5).unwrap().len(), 2);
		assert!(left.merge(&NGramModel::new(3).unwrap()).is_err());
	}
}
