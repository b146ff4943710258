//! Namespaced, expiring cache over a [`KeyValueStore`].

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::ErrorKind;
use super::kv::KeyValueStore;
use super::traits::{CacheEntry, Clock, SystemClock};

/// Key prefix isolating cache entries from other data in the same store.
pub const CACHE_PREFIX: &str = "offline_cache_";

/// Best-effort local cache.
///
/// Entries are JSON `{data, timestamp}` documents stored under
/// `namespace + key`. Reads older than the TTL are misses. No operation
/// returns an error: backend and decoding failures are logged and treated as a
/// miss (reads) or a lost write (writes).
pub struct LocalCache<S> {
  store: Arc<S>,
  namespace: String,
  clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> LocalCache<S> {
  /// Create a cache over `store` with the default namespace and system clock.
  pub fn new(store: S) -> Self {
    Self {
      store: Arc::new(store),
      namespace: CACHE_PREFIX.to_string(),
      clock: Arc::new(SystemClock),
    }
  }

  /// Use a different key prefix.
  pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = namespace.into();
    self
  }

  /// Replace the clock used for timestamps and expiry checks.
  #[cfg(test)]
  pub(crate) fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  #[cfg(test)]
  pub(crate) fn store(&self) -> &S {
    &self.store
  }

  /// Current time in epoch milliseconds according to the cache clock.
  pub fn now_ms(&self) -> i64 {
    self.clock.now_ms()
  }

  fn namespaced(&self, key: &str) -> String {
    format!("{}{}", self.namespace, key)
  }

  /// Read a non-expired value.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    self.get_entry(key).map(|entry| entry.data)
  }

  /// Read a non-expired entry along with its write timestamp.
  pub fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
    let full_key = self.namespaced(key);

    let raw = match self.store.get(&full_key) {
      Ok(Some(raw)) => raw,
      Ok(None) => {
        debug!(key = %full_key, "cache miss");
        return None;
      }
      Err(e) => {
        warn!(key = %full_key, kind = %ErrorKind::StorageRead, error = %e, "Error loading from cache");
        return None;
      }
    };

    let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key = %full_key, kind = %ErrorKind::Deserialize, error = %e, "Error loading from cache");
        return None;
      }
    };

    if entry.is_expired(self.now_ms()) {
      debug!(key = %full_key, timestamp = entry.timestamp, "cache entry expired");
      return None;
    }

    debug!(key = %full_key, "cache hit");
    Some(entry)
  }

  /// Store `data` stamped with the current time, replacing any previous entry.
  pub fn set<T: Serialize>(&self, key: &str, data: &T) {
    let full_key = self.namespaced(key);
    let entry = CacheEntry {
      data,
      timestamp: self.now_ms(),
    };

    let raw = match serde_json::to_string(&entry) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(key = %full_key, kind = %ErrorKind::StorageWrite, error = %e, "Error saving to cache");
        return;
      }
    };

    if let Err(e) = self.store.set(&full_key, &raw) {
      warn!(key = %full_key, kind = %ErrorKind::StorageWrite, error = %e, "Error saving to cache");
    }
  }

  /// Delete one entry, or every entry in the namespace when `key` is `None`.
  pub fn clear(&self, key: Option<&str>) {
    let targets = match key {
      Some(key) => vec![self.namespaced(key)],
      None => match self.store.keys() {
        Ok(keys) => keys
          .into_iter()
          .filter(|k| k.starts_with(&self.namespace))
          .collect(),
        Err(e) => {
          warn!(kind = %ErrorKind::StorageRead, error = %e, "Error listing cache keys");
          return;
        }
      },
    };

    for full_key in targets {
      if let Err(e) = self.store.remove(&full_key) {
        warn!(key = %full_key, kind = %ErrorKind::StorageWrite, error = %e, "Error clearing cache");
      }
    }
  }
}

impl<S> Clone for LocalCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      namespace: self.namespace.clone(),
      clock: Arc::clone(&self.clock),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::kv::MemoryStore;
  use crate::cache::traits::testing::ManualClock;
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Rates {
    usd: u32,
  }

  fn cache_with_clock(store: MemoryStore) -> (LocalCache<MemoryStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cache = LocalCache::new(store).with_clock(clock.clone());
    (cache, clock)
  }

  #[test]
  fn test_round_trip_within_ttl() {
    let (cache, clock) = cache_with_clock(MemoryStore::new());
    cache.set("rates", &Rates { usd: 83 });
    clock.advance_hours(23);
    assert_eq!(cache.get::<Rates>("rates"), Some(Rates { usd: 83 }));
  }

  #[test]
  fn test_entry_older_than_ttl_is_absent() {
    let (cache, clock) = cache_with_clock(MemoryStore::new());
    cache.set("rates", &Rates { usd: 83 });
    clock.advance_hours(25);
    assert_eq!(cache.get::<Rates>("rates"), None);
    // Expired entries are not swept on read
    assert!(cache.store().get("offline_cache_rates").unwrap().is_some());
  }

  #[test]
  fn test_set_overwrites_and_restamps() {
    let (cache, clock) = cache_with_clock(MemoryStore::new());
    cache.set("rates", &Rates { usd: 80 });
    clock.advance_hours(20);
    cache.set("rates", &Rates { usd: 83 });
    clock.advance_hours(20);

    let entry = cache.get_entry::<Rates>("rates").unwrap();
    assert_eq!(entry.data, Rates { usd: 83 });
    assert_eq!(entry.timestamp, cache.now_ms() - 20 * 60 * 60 * 1000);
  }

  #[test]
  fn test_uses_namespaced_key() {
    let (cache, _) = cache_with_clock(MemoryStore::new());
    cache.set("rates", &Rates { usd: 83 });
    assert_eq!(
      cache.store().keys().unwrap(),
      vec!["offline_cache_rates".to_string()]
    );
  }

  #[test]
  fn test_corrupt_entry_is_a_miss() {
    let store = MemoryStore::new();
    store.set("offline_cache_rates", "{not json").unwrap();
    store
      .set("offline_cache_shape", r#"{"data":"text","timestamp":1}"#)
      .unwrap();
    let (cache, _) = cache_with_clock(store);

    assert_eq!(cache.get::<Rates>("rates"), None);
    // Schema mismatch is treated the same way
    assert_eq!(cache.get::<Rates>("shape"), None);
  }

  #[test]
  fn test_write_failure_is_swallowed() {
    let (cache, _) = cache_with_clock(MemoryStore::with_limit(1));
    cache.set("first", &Rates { usd: 1 });
    cache.set("second", &Rates { usd: 2 });

    assert_eq!(cache.get::<Rates>("first"), Some(Rates { usd: 1 }));
    assert_eq!(cache.get::<Rates>("second"), None);
  }

  #[test]
  fn test_clear_single_key() {
    let (cache, _) = cache_with_clock(MemoryStore::new());
    cache.set("a", &1);
    cache.set("b", &2);

    cache.clear(Some("a"));

    assert_eq!(cache.get::<i32>("a"), None);
    assert_eq!(cache.get::<i32>("b"), Some(2));
  }

  #[test]
  fn test_clear_all_leaves_foreign_keys() {
    let store = MemoryStore::new();
    store.set("preferred_language", "hi").unwrap();
    let (cache, _) = cache_with_clock(store);
    cache.set("a", &1);
    cache.set("b", &2);

    cache.clear(None);

    assert_eq!(cache.get::<i32>("a"), None);
    assert_eq!(cache.get::<i32>("b"), None);
    assert_eq!(
      cache.store().keys().unwrap(),
      vec!["preferred_language".to_string()]
    );
  }

  #[test]
  fn test_custom_namespace_is_isolated() {
    let (cache, _) = cache_with_clock(MemoryStore::new());
    let other = cache.clone().with_namespace("other_");
    cache.set("k", &1);
    other.set("k", &2);

    other.clear(None);

    assert_eq!(cache.get::<i32>("k"), Some(1));
    assert_eq!(other.get::<i32>("k"), None);
  }
}
