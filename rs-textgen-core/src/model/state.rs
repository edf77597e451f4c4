use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// Represents a state in an n-gram model.
///
/// A `State` corresponds to a fixed (n-1)-character prefix (`key`) and stores
/// all observed transitions from this prefix to the next character.
///
/// ## Invariants
/// - All transitions belong to the same `key`
/// - Each transition occurrence count is strictly positive
/// - `total` is the sum of all occurrence counts
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct State {
	/// Identifier of the state (n-1 character prefix).
	key: String,
	/// Outgoing transitions indexed by the next character.
	/// Example: { 'e' => 42, 'a' => 3 }
	transitions: HashMap<char, usize>,
	total: usize,
}

impl State {
	/// Creates a new empty state for the given prefix.
	pub fn new(key: &str) -> Self {
		Self { key: key.to_owned(), transitions: HashMap::new(), total: 0 }
	}

	/// Records an occurrence of a transition toward `next_char`.
	pub fn add_transition(&mut self, next_char: char) {
		*self.transitions.entry(next_char).or_insert(0) += 1;
		self.total += 1;
	}

	/// Returns up to `k` next characters, most observed first.
	///
	/// Each probability is the occurrence count over all transitions of the
	/// state, so the returned values only sum to 1 when nothing was cut.
	/// Ties are ordered by character to keep results reproducible.
	pub fn top(&self, k: usize) -> Vec<(char, f32)> {
		if self.total == 0 {
			return Vec::new();
		}

		let mut ranked: Vec<(char, usize)> = self.transitions.iter().map(|(c, n)| (*c, *n)).collect();
		ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
		ranked.truncate(k);

		let total = self.total as f32;
		ranked.into_iter().map(|(c, n)| (c, n as f32 / total)).collect()
	}

	/// Merges another state into this one. Occurrence counts are summed.
	///
	/// # Errors
	/// Returns an error if the state keys do not match.
	pub fn merge(&mut self, other: &Self) -> Result<(), OracleError> {
		if self.key != other.key {
			return Err(OracleError::Model(format!("key mismatch: {:?} vs {:?}", self.key, other.key)));
		}

		for (next_char, occurrence) in &other.transitions {
			*self.transitions.entry(*next_char).or_insert(0) += *occurrence;
		}
		self.total += other.total;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn top_ranks_by_count() {
		let mut state = State::new("th");
		for c in "eeeaai".chars() {
			state.add_transition(c);
		}
		let top = state.top(2);
		assert_eq!(top, vec![('e', 0.5), ('a', 2.0 / 6.0)]);
	}

	#[test]
	fn ties_are_ordered_by_character() {
		let mut state = State::new("");
		for c in "cba".chars() {
			state.add_transition(c);
		}
		let chars: Vec<char> = state.top(3).into_iter().map(|(c, _)| c).collect();
		assert_eq!(chars, vec!['a', 'b', 'c']);
	}

	#[test]
	fn merge_sums_counts() {
		let mut left = State::new("a");
		left.add_transition('b');
		let mut right = State::new("a");
		right.add_transition('b');
		right.add_transition('c');
		left.merge(&right).unwrap();
		assert_eq!(left.top(5), vec![('b', 2.0 / 3.0), ('c', 1.0 / 3.0)]);

		assert!(left.merge(&State::new("z")).is_err());
	}
}
