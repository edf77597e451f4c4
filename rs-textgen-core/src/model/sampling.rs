use rand::RngCore;

use crate::error::GenerationError;
use crate::oracle::CandidateSet;

/// Temperature transform and weighted choice over a [`CandidateSet`].
///
/// Each candidate probability `p` is reshaped to
/// `p ^ ((max_temperature - temperature) / exponent_scale)`. Low temperatures
/// sharpen the distribution, `max_temperature` makes every candidate equally
/// likely. A temperature of exactly zero is deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPolicy {
	max_temperature: f32,
	exponent_scale: f32,
}

impl SamplingPolicy {
	pub fn new(max_temperature: f32, exponent_scale: f32) -> Self {
		Self { max_temperature, exponent_scale }
	}

	/// Clamps `temperature` into `[0, max_temperature]`. NaN becomes 0.
	pub fn clamp(&self, temperature: f32) -> f32 {
		if temperature.is_nan() {
			return 0.0;
		}
		temperature.clamp(0.0, self.max_temperature)
	}

	/// Exponent applied to candidate probabilities at `temperature`.
	pub fn exponent(&self, temperature: f32) -> f32 {
		(self.max_temperature - self.clamp(temperature)) / self.exponent_scale
	}

	/// Picks the vocabulary index of the next symbol.
	///
	/// # Errors
	/// `EmptyCandidateSet` if there is nothing to choose from.
	pub fn choose(
		&self,
		candidates: &CandidateSet,
		temperature: f32,
		rng: &mut dyn RngCore,
	) -> Result<usize, GenerationError> {
		if candidates.is_empty() {
			return Err(GenerationError::EmptyCandidateSet);
		}

		let temperature = self.clamp(temperature);
		if temperature == 0.0 {
			return Self::most_probable(candidates);
		}

		let exponent = self.exponent(temperature);
		let weights: Vec<f32> = candidates.iter().map(|c| c.probability.max(0.0).powf(exponent)).collect();
		let sum: f32 = weights.iter().sum();
		if !(sum.is_finite() && sum > 0.0) {
			log::warn!("Degenerate candidate weights (sum = {sum}), falling back to the most probable candidate");
			return Self::most_probable(candidates);
		}

		let r = unit_interval(rng);
		let mut cumulative = 0.0;
		for (candidate, weight) in candidates.iter().zip(&weights) {
			cumulative += f64::from(weight / sum);
			if cumulative > r {
				return Ok(candidate.index);
			}
		}

		// Rounding left some mass unassigned: the last candidate takes it.
		candidates
			.as_slice()
			.last()
			.map(|c| c.index)
			.ok_or(GenerationError::EmptyCandidateSet)
	}

	/// First candidate with the strictly highest probability.
	fn most_probable(candidates: &CandidateSet) -> Result<usize, GenerationError> {
		let mut best: Option<(usize, f32)> = None;
		for candidate in candidates.iter() {
			if best.is_none_or(|(_, probability)| candidate.probability > probability) {
				best = Some((candidate.index, candidate.probability));
			}
		}
		best.map(|(index, _)| index).ok_or(GenerationError::EmptyCandidateSet)
	}
}

/// Uniform value in `[0, 1)` built from the top 53 bits of one `u64` draw.
fn unit_interval(rng: &mut dyn RngCore) -> f64 {
	(rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
