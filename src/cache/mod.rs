//! Offline-capable caching layer.
//!
//! This module provides:
//! - A narrow key-value storage interface with SQLite and in-memory backends
//! - A namespaced local cache whose entries expire after 24 hours
//! - A cache-first fetch coordinator that serves cached data when offline or
//!   when the network call fails

mod error;
mod kv;
mod layer;
mod local;
mod storage;
mod traits;

pub use kv::{KeyValueStore, MemoryStore, NoopStore};
pub use layer::{CachedFetch, FetchState};
pub use local::LocalCache;
pub use storage::SqliteStore;
pub use traits::DataSource;
