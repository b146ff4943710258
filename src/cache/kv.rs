//! Key-value storage trait and in-process implementations.

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::error::StoreError;

/// Narrow string-keyed, string-valued storage interface.
///
/// Everything the local cache needs from a persistence substrate: point reads,
/// writes, deletes and key enumeration. Calls are synchronous.
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

  /// Delete `key`. Deleting a missing key is not an error.
  fn remove(&self, key: &str) -> Result<(), StoreError>;

  /// List every key currently stored.
  fn keys(&self) -> Result<Vec<String>, StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    (**self).set(key, value)
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    (**self).remove(key)
  }

  fn keys(&self) -> Result<Vec<String>, StoreError> {
    (**self).keys()
  }
}

/// Storage implementation that doesn't keep anything.
/// Used when caching is disabled - writes are discarded, reads always miss.
pub struct NoopStore;

impl KeyValueStore for NoopStore {
  fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
    Ok(None)
  }

  fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
    Ok(())
  }

  fn remove(&self, _key: &str) -> Result<(), StoreError> {
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>, StoreError> {
    Ok(Vec::new())
  }
}

/// In-process store backed by an ordered map.
///
/// An optional entry limit makes writes of new keys fail with
/// [`StoreError::QuotaExceeded`], the way a full browser storage area does.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<String, String>>,
  limit: Option<usize>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Cap the number of keys the store accepts.
  pub fn with_limit(limit: usize) -> Self {
    Self {
      entries: Mutex::default(),
      limit: Some(limit),
    }
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
    self
      .entries
      .lock()
      .map_err(|e| StoreError::LockPoisoned(e.to_string()))
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.lock()?.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut entries = self.lock()?;
    if let Some(limit) = self.limit {
      if !entries.contains_key(key) && entries.len() >= limit {
        return Err(StoreError::QuotaExceeded { limit });
      }
    }
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    self.lock()?.remove(key);
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>, StoreError> {
    Ok(self.lock()?.keys().cloned().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_store_overwrites() {
    let store = MemoryStore::new();
    store.set("a", "1").unwrap();
    store.set("a", "2").unwrap();
    assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
    assert_eq!(store.keys().unwrap(), vec!["a".to_string()]);
  }

  #[test]
  fn test_memory_store_limit_rejects_new_keys_only() {
    let store = MemoryStore::with_limit(1);
    store.set("a", "1").unwrap();
    assert!(matches!(
      store.set("b", "1"),
      Err(StoreError::QuotaExceeded { limit: 1 })
    ));
    // Replacing an existing key does not grow the store
    store.set("a", "2").unwrap();
    assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
  }

  #[test]
  fn test_noop_store_always_misses() {
    let store = NoopStore;
    store.set("a", "1").unwrap();
    assert_eq!(store.get("a").unwrap(), None);
    assert!(store.keys().unwrap().is_empty());
  }

  #[test]
  fn test_boxed_store_delegates() {
    let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
    store.set("k", "v").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    store.remove("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
  }
}
