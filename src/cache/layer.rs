//! Cache layer that orchestrates caching logic with network fetching.

use std::future::Future;
use std::sync::Arc;

use super::storage::CacheStorage;
use super::traits::{CacheDurations, CacheResult, QueryKey};

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the caller and the network client. It never
/// serves expired data and never caches failures: an error from the fetcher
/// is returned as-is and the next call for the same key fetches again.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  durations: CacheDurations,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      durations: CacheDurations::default(),
    }
  }

  /// Set the durations used for each cache tier.
  pub fn with_durations(mut self, durations: CacheDurations) -> Self {
    self.durations = durations;
    self
  }

  pub fn durations(&self) -> CacheDurations {
    self.durations
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Check cache - if present and unexpired, return without calling `fetcher`
  /// 2. Otherwise run `fetcher`
  /// 3. On success store the value for the key's tier duration and return it
  /// 4. On failure propagate the error, nothing is stored
  ///
  /// Concurrent misses on the same key may both run their fetcher; the last
  /// write wins.
  pub async fn fetch<K, T, E, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, E>
  where
    K: QueryKey + ?Sized,
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let hash = key.cache_hash();

    if let Some(cached) = self.storage.get::<T>(&hash) {
      tracing::debug!(query = %key.description(), "cache hit");
      return Ok(CacheResult::from_cache(cached));
    }

    tracing::debug!(query = %key.description(), "cache miss");
    let data = fetcher().await?;
    let ttl = self.durations.for_tier(key.tier());
    self.storage.insert(&hash, data.clone(), ttl);
    Ok(CacheResult::from_network(data))
  }

  /// Drop every cached entry.
  pub fn purge(&self) -> bool {
    self.storage.purge()
  }

  /// Number of entries currently held.
  pub fn len(&self) -> usize {
    self.storage.len()
  }

  pub fn is_empty(&self) -> bool {
    self.storage.is_empty()
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      durations: self.durations,
    }
  }
}
