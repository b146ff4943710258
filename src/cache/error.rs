//! Error types for the cache backends.

use std::fmt;

/// Failure raised by a [`KeyValueStore`](super::KeyValueStore) backend.
///
/// These never leave the cache layer; they are logged and swallowed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The backend refused the write because it is full
  #[error("storage quota exceeded ({limit} entries)")]
  QuotaExceeded { limit: usize },
  /// SQLite reported an error
  #[error("sqlite: {0}")]
  Sqlite(#[from] rusqlite::Error),
  /// A thread panicked while holding the backend lock
  #[error("lock poisoned: {0}")]
  LockPoisoned(String),
}

/// Classification attached to every swallowed failure in the log output.
///
/// Lets an operator tell cache corruption apart from network trouble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A stored entry could not be decoded
  Deserialize,
  /// The backend failed while reading
  StorageRead,
  /// The backend failed while writing or deleting
  StorageWrite,
  /// The producer function failed
  Producer,
}

impl ErrorKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ErrorKind::Deserialize => "deserialize",
      ErrorKind::StorageRead => "storage_read",
      ErrorKind::StorageWrite => "storage_write",
      ErrorKind::Producer => "producer",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
