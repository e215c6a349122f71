//! Generic in-memory caching layer for remote API responses.
//!
//! This module is TVDB-agnostic and provides:
//! - Typed query keys that hash every response-affecting parameter
//! - Two expiration tiers (short for per-entity lookups, long for reference data)
//! - Passive expiry: stale entries are evicted on the next lookup
//! - Atomic purge of every entry

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage};
pub use traits::{CacheDurations, CacheResult, CacheSource, CacheTier, QueryKey};
