//! Core traits and types for the caching system.

use std::time::Duration;

/// Trait for typed request descriptors that can be used as cache keys.
///
/// Implementors build a canonical representation that includes every
/// parameter affecting the shape of the response. Two descriptors that would
/// produce different responses must never share a `cache_hash`.
pub trait QueryKey: Send + Sync {
  /// Stable, fixed-length key used for storage lookups.
  fn cache_hash(&self) -> String;

  /// Human-readable description for logs (e.g., "series 121361 extended").
  fn description(&self) -> String;

  /// Which expiration tier applies to this request.
  fn tier(&self) -> CacheTier;
}

/// Expiration tier for a cached call class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
  /// Volatile per-entity lookups (series, episodes, searches, artwork)
  Short,
  /// Near-static reference data (languages, artwork types)
  Long,
}

/// Concrete durations for each cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDurations {
  pub short: Duration,
  pub long: Duration,
}

impl CacheDurations {
  pub fn for_tier(&self, tier: CacheTier) -> Duration {
    match tier {
      CacheTier::Short => self.short,
      CacheTier::Long => self.long,
    }
  }
}

impl Default for CacheDurations {
  fn default() -> Self {
    Self {
      short: Duration::from_secs(60 * 60),
      long: Duration::from_secs(7 * 24 * 60 * 60),
    }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  pub fn is_cached(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Unexpired entry from the in-memory cache
  Cache,
}
