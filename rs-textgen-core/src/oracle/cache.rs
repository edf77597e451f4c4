use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{info, warn};
use tokio::sync::OnceCell;

use crate::error::{GenerationError, OracleError};
use super::OracleLoader;

type Slot<O> = Arc<OnceCell<Arc<O>>>;

/// Cache of loaded oracles, keyed by source id.
///
/// Concurrent acquisitions of the same source share a single load: the first
/// caller runs the loader, the others await its completion. A failed load is
/// not remembered, so the next acquisition loads again.
///
/// The cache is an ordinary value; share it between engines with an `Arc`.
pub struct OracleCache<L: OracleLoader> {
	loader: L,
	slots: Mutex<HashMap<String, Slot<L::Oracle>>>,
}

impl<L: OracleLoader> OracleCache<L> {
	pub fn new(loader: L) -> Self {
		Self { loader, slots: Mutex::new(HashMap::new()) }
	}

	pub fn loader(&self) -> &L {
		&self.loader
	}

	/// Returns the oracle for `source_id`, loading it if needed.
	///
	/// Each load attempt is bounded by `timeout`. A failed attempt is retried
	/// once before the error is surfaced, and the empty slot is then dropped.
	///
	/// # Errors
	/// `GenerationError::OracleUnavailable` when both attempts fail.
	pub async fn acquire(&self, source_id: &str, timeout: Duration) -> Result<Arc<L::Oracle>, GenerationError> {
		match self.try_acquire(source_id, timeout).await {
			Ok(oracle) => Ok(oracle),
			Err(first) => {
				warn!("Loading source {source_id:?} failed ({first}), retrying once");
				self.try_acquire(source_id, timeout).await.map_err(|reason| {
					if !self.is_loaded(source_id) {
						self.evict(source_id);
					}
					GenerationError::OracleUnavailable { source_id: source_id.to_owned(), reason }
				})
			}
		}
	}

	/// Whether `source_id` is loaded and ready.
	pub fn is_loaded(&self, source_id: &str) -> bool {
		self.slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.get(source_id)
			.is_some_and(|slot| slot.initialized())
	}

	/// Drops the cached oracle for `source_id`. In-flight users keep their handle.
	pub fn evict(&self, source_id: &str) {
		self.slots.lock().unwrap_or_else(PoisonError::into_inner).remove(source_id);
	}

	fn slot(&self, source_id: &str) -> Slot<L::Oracle> {
		self.slots
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.entry(source_id.to_owned())
			.or_default()
			.clone()
	}

	async fn try_acquire(&self, source_id: &str, timeout: Duration) -> Result<Arc<L::Oracle>, OracleError> {
		let slot = self.slot(source_id);
		let oracle = slot
			.get_or_try_init(|| async {
				info!("Loading scoring model for source {source_id:?}");
				let oracle = tokio::time::timeout(timeout, self.loader.load(source_id))
					.await
					.map_err(|_| OracleError::Timeout(timeout))??;
				info!("Scoring model for source {source_id:?} ready");
				Ok::<_, OracleError>(Arc::new(oracle))
			})
			.await?;
		Ok(Arc::clone(oracle))
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::model::window::ContextWindow;
	use crate::oracle::{CandidateSet, ScoringOracle};

	#[derive(Debug)]
	struct Fixed;

	impl ScoringOracle for Fixed {
		fn window_width(&self) -> usize {
			1
		}

		async fn score(&self, _window: &ContextWindow, _max_candidates: usize) -> Result<CandidateSet, OracleError> {
			Ok(CandidateSet::from(vec![(0, 1.0)]))
		}
	}

	/// Fails the first `failures` loads, then succeeds.
	struct Flaky {
		loads: AtomicUsize,
		failures: usize,
		delay: Duration,
	}

	impl Flaky {
		fn new(failures: usize, delay: Duration) -> Self {
			Self { loads: AtomicUsize::new(0), failures, delay }
		}
	}

	impl OracleLoader for Flaky {
		type Oracle = Fixed;

		async fn load(&self, source_id: &str) -> Result<Fixed, OracleError> {
			let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(self.delay).await;
			if attempt < self.failures {
				return Err(OracleError::UnknownSource(source_id.to_owned()));
			}
			Ok(Fixed)
		}
	}

	#[tokio::test]
	async fn concurrent_acquisitions_share_one_load() {
		let cache = Arc::new(OracleCache::new(Flaky::new(0, Duration::from_millis(20))));
		let (a, b) = tokio::join!(
			cache.acquire("seuss", Duration::from_secs(1)),
			cache.acquire("seuss", Duration::from_secs(1))
		);
		assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
		assert_eq!(cache.loader().loads.load(Ordering::SeqCst), 1);
		assert!(cache.is_loaded("seuss"));
	}

	#[tokio::test]
	async fn distinct_sources_load_separately() {
		let cache = OracleCache::new(Flaky::new(0, Duration::ZERO));
		cache.acquire("seuss", Duration::from_secs(1)).await.unwrap();
		cache.acquire("jokes", Duration::from_secs(1)).await.unwrap();
		cache.acquire("seuss", Duration::from_secs(1)).await.unwrap();
		assert_eq!(cache.loader().loads.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn one_failure_is_retried() {
		let cache = OracleCache::new(Flaky::new(1, Duration::ZERO));
		assert!(cache.acquire("seuss", Duration::from_secs(1)).await.is_ok());
		assert_eq!(cache.loader().loads.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn two_failures_are_surfaced_and_not_cached() {
		let cache = OracleCache::new(Flaky::new(2, Duration::ZERO));
		let error = cache.acquire("seuss", Duration::from_secs(1)).await.unwrap_err();
		assert!(matches!(error, GenerationError::OracleUnavailable { .. }));
		assert!(!cache.is_loaded("seuss"));
		assert!(cache.slots.lock().unwrap().is_empty());

		// The failure was not cached: the next request loads again and succeeds.
		assert!(cache.acquire("seuss", Duration::from_secs(1)).await.is_ok());
		assert_eq!(cache.loader().loads.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn slow_load_times_out() {
		let cache = OracleCache::new(Flaky::new(0, Duration::from_secs(60)));
		let error = cache.acquire("seuss", Duration::from_secs(1)).await.unwrap_err();
		match error {
			GenerationError::OracleUnavailable { reason: OracleError::Timeout(timeout), .. } => {
				assert_eq!(timeout, Duration::from_secs(1));
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn evicted_source_is_reloaded() {
		let cache = OracleCache::new(Flaky::new(0, Duration::ZERO));
		cache.acquire("seuss", Duration::from_secs(1)).await.unwrap();
		cache.evict("seuss");
		assert!(!cache.is_loaded("seuss"));
		cache.acquire("seuss", Duration::from_secs(1)).await.unwrap();
		assert_eq!(cache.loader().loads.load(Ordering::SeqCst), 2);
	}
}
