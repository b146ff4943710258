//! Core types shared by the cache store and the fetch coordinator.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Maximum age of a cache entry, in milliseconds (24 hours).
pub const CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// A stored payload together with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub data: T,
  /// Write time as epoch milliseconds
  pub timestamp: i64,
}

impl<T> CacheEntry<T> {
  /// Whether the entry is older than the TTL at `now_ms`.
  pub fn is_expired(&self, now_ms: i64) -> bool {
    now_ms - self.timestamp > CACHE_TTL_MS
  }

  /// Write time as a UTC datetime.
  pub fn written_at(&self) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(self.timestamp).single()
  }
}

/// Source of a wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
  fn now_ms(&self) -> i64;
}

/// Clock reading the system time.
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_ms(&self) -> i64 {
    Utc::now().timestamp_millis()
  }
}

/// Indicates where the surfaced data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
  /// Nothing surfaced yet
  #[default]
  None,
  /// Fresh data from the producer
  Network,
  /// Data read from the local cache while online (initial paint or fallback)
  Cache,
  /// Offline mode - network skipped, serving cached data
  Offline,
}

#[cfg(test)]
pub(crate) mod testing {
  use super::Clock;
  use std::sync::atomic::{AtomicI64, Ordering};

  /// Hand-driven clock for expiry tests.
  pub struct ManualClock(AtomicI64);

  impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
      Self(AtomicI64::new(now_ms))
    }

    pub fn advance_hours(&self, hours: i64) {
      self.0.fetch_add(hours * 60 * 60 * 1000, Ordering::SeqCst);
    }
  }

  impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
      self.0.load(Ordering::SeqCst)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_expiry_boundary() {
    let entry = CacheEntry {
      data: (),
      timestamp: 1_000,
    };
    assert!(!entry.is_expired(1_000 + CACHE_TTL_MS));
    assert!(entry.is_expired(1_000 + CACHE_TTL_MS + 1));
    // Entries written "in the future" by a skewed clock still count as valid
    assert!(!entry.is_expired(0));
  }

  #[test]
  fn test_entry_json_shape() {
    let entry = CacheEntry {
      data: vec![1, 2],
      timestamp: 42,
    };
    let json = serde_json::to_string(&entry).unwrap();
    assert_eq!(json, r#"{"data":[1,2],"timestamp":42}"#);
  }
}
