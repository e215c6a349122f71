//! Cache storage trait and in-memory implementation.

use dashmap::DashMap;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A single cached value with its expiry.
#[derive(Clone)]
struct CacheEntry {
  value: Arc<dyn Any + Send + Sync>,
  expires_at: Instant,
  generation: u64,
}

impl CacheEntry {
  fn is_live(&self, now: Instant, generation: u64) -> bool {
    self.generation == generation && now < self.expires_at
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get an unexpired value by key. Expired entries are evicted lazily here.
  fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T>;

  /// Store a value that expires `ttl` from now, replacing any previous entry.
  fn insert<T: Clone + Send + Sync + 'static>(&self, key: &str, value: T, ttl: Duration);

  /// Drop every entry. Returns whether the purge succeeded.
  fn purge(&self) -> bool;

  /// Number of entries currently held (expired ones included until evicted).
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// In-memory expiring map safe for concurrent readers and writers.
///
/// Purging bumps a generation counter before clearing, so every entry stored
/// before the purge becomes a miss at the same instant even while the shards
/// are still being emptied.
#[derive(Default)]
pub struct MemoryStorage {
  entries: DashMap<String, CacheEntry>,
  generation: AtomicU64,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn current_generation(&self) -> u64 {
    self.generation.load(Ordering::Acquire)
  }
}

impl CacheStorage for MemoryStorage {
  fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
    let now = Instant::now();
    let generation = self.current_generation();

    // The read guard must be dropped before removing from the same shard.
    let stale = match self.entries.get(key) {
      Some(entry) if entry.is_live(now, generation) => {
        let value = entry.value.downcast_ref::<T>().cloned();
        if value.is_none() {
          tracing::warn!(key, "cached value has unexpected type, treating as miss");
        }
        return value;
      }
      Some(_) => true,
      None => false,
    };

    if stale {
      self
        .entries
        .remove_if(key, |_, entry| !entry.is_live(now, generation));
    }
    None
  }

  fn insert<T: Clone + Send + Sync + 'static>(&self, key: &str, value: T, ttl: Duration) {
    let entry = CacheEntry {
      value: Arc::new(value),
      expires_at: Instant::now() + ttl,
      generation: self.current_generation(),
    };
    self.entries.insert(key.to_string(), entry);
  }

  fn purge(&self) -> bool {
    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
    self.entries.retain(|_, entry| entry.generation == generation);
    true
  }

  fn len(&self) -> usize {
    self.entries.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const HOUR: Duration = Duration::from_secs(3600);

  #[tokio::test]
  async fn test_insert_then_get() {
    let storage = MemoryStorage::new();
    storage.insert("a", vec![1, 2, 3], HOUR);
    assert_eq!(storage.get::<Vec<i32>>("a"), Some(vec![1, 2, 3]));
    assert_eq!(storage.get::<Vec<i32>>("b"), None);
  }

  #[tokio::test]
  async fn test_type_mismatch_is_miss() {
    let storage = MemoryStorage::new();
    storage.insert("a", 42u32, HOUR);
    assert_eq!(storage.get::<String>("a"), None);
    assert_eq!(storage.get::<u32>("a"), Some(42));
  }

  #[tokio::test(start_paused = true)]
  async fn test_expired_entry_is_evicted_on_lookup() {
    let storage = MemoryStorage::new();
    storage.insert("a", "value".to_string(), HOUR);

    tokio::time::advance(HOUR - Duration::from_secs(1)).await;
    assert_eq!(storage.get::<String>("a").as_deref(), Some("value"));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(storage.get::<String>("a"), None);
    assert!(storage.is_empty());
  }

  #[tokio::test]
  async fn test_replace_overwrites() {
    let storage = MemoryStorage::new();
    storage.insert("a", 1u8, HOUR);
    storage.insert("a", 2u8, HOUR);
    assert_eq!(storage.get::<u8>("a"), Some(2));
    assert_eq!(storage.len(), 1);
  }

  #[tokio::test]
  async fn test_purge_clears_everything() {
    let storage = MemoryStorage::new();
    storage.insert("a", 1u8, HOUR);
    storage.insert("b", 2u8, HOUR);

    assert!(storage.purge());
    assert!(storage.is_empty());
    assert_eq!(storage.get::<u8>("a"), None);

    // Entries stored after a purge are live again
    storage.insert("a", 3u8, HOUR);
    assert_eq!(storage.get::<u8>("a"), Some(3));
  }
}
