//! Cache-first fetch coordinator with offline support.
//!
//! A [`CachedFetch`] ties one cache key to one producer function. It paints
//! from the local cache first, refreshes from the producer when the network is
//! available, and falls back to the cache when it is not or when the producer
//! fails. Its state is published on a `watch` channel so consumers can render
//! every step.
//!
//! # Example
//!
//! ```ignore
//! let backend = client.clone();
//! let customers = CachedFetch::new("customers", cache, monitor, move || {
//!     let backend = backend.clone();
//!     async move { backend.list_customers().await }
//! });
//!
//! let _reconnect = customers.refresh_on_reconnect();
//! let state = customers.mount().await;
//! ```

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::error::ErrorKind;
use super::kv::KeyValueStore;
use super::local::LocalCache;
use super::traits::{CacheEntry, DataSource};
use crate::connectivity::{Connectivity, ConnectivityMonitor};

/// A boxed future that returns the producer's result
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Snapshot of what a consumer should render.
#[derive(Debug, Clone)]
pub struct FetchState<T> {
  /// Best available data, if any
  pub data: Option<T>,
  /// Nothing to show yet and a result is still expected
  pub loading: bool,
  /// A producer call is in flight
  pub refreshing: bool,
  /// Connectivity as of the last trigger
  pub offline: bool,
  /// Where `data` came from
  pub source: DataSource,
  /// When `data` was written to the cache
  pub last_updated: Option<DateTime<Utc>>,
}

impl<T> FetchState<T> {
  fn initial(offline: bool) -> Self {
    Self {
      data: None,
      loading: true,
      refreshing: false,
      offline,
      source: DataSource::None,
      last_updated: None,
    }
  }

  fn apply_cached(&mut self, cached: Option<CacheEntry<T>>, source: DataSource) {
    match cached {
      Some(entry) => {
        self.last_updated = entry.written_at();
        self.data = Some(entry.data);
        self.source = source;
      }
      None => {
        self.data = None;
        self.source = DataSource::None;
        self.last_updated = None;
      }
    }
  }
}

struct Inner<T, S> {
  key: String,
  cache: LocalCache<S>,
  connectivity: ConnectivityMonitor,
  fetcher: FetcherFn<T>,
  state: watch::Sender<FetchState<T>>,
  in_flight: AtomicUsize,
}

/// Coordinator for one cache key and its producer.
///
/// Every trigger (mount, reconnect, manual refresh) makes at most one producer
/// call. There are no retries and no cancellation: overlapping refreshes all
/// complete and the one that resolves last wins.
pub struct CachedFetch<T, S> {
  inner: Arc<Inner<T, S>>,
}

impl<T, S> CachedFetch<T, S>
where
  T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
  S: KeyValueStore + 'static,
{
  /// Create a coordinator for `key`.
  ///
  /// The fetcher is called once per refresh and must produce fresh data.
  pub fn new<F, Fut>(
    key: impl Into<String>,
    cache: LocalCache<S>,
    connectivity: ConnectivityMonitor,
    fetcher: F,
  ) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let (state, _) = watch::channel(FetchState::initial(connectivity.is_offline()));
    Self {
      inner: Arc::new(Inner {
        key: key.into(),
        cache,
        connectivity,
        fetcher: Box::new(move || Box::pin(fetcher())),
        state,
        in_flight: AtomicUsize::new(0),
      }),
    }
  }

  pub fn key(&self) -> &str {
    &self.inner.key
  }

  /// Current snapshot.
  pub fn state(&self) -> FetchState<T> {
    self.inner.state.borrow().clone()
  }

  /// Follow every state change.
  pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
    self.inner.state.subscribe()
  }

  /// Initial load: paint from cache, then run one refresh.
  pub async fn mount(&self) -> FetchState<T> {
    if let Some(entry) = self.inner.cache.get_entry::<T>(&self.inner.key) {
      debug!(key = %self.inner.key, "painting from cache");
      self.inner.state.send_modify(|s| {
        s.apply_cached(Some(entry), DataSource::Cache);
        s.loading = false;
      });
    }

    self.refresh().await
  }

  /// Run one refresh: the producer when online, the cache when offline or
  /// when the producer fails. Never returns an error.
  pub async fn refresh(&self) -> FetchState<T> {
    let inner = &self.inner;

    if inner.connectivity.is_offline() {
      debug!(key = %inner.key, "offline, serving cache");
      let cached = inner.cache.get_entry::<T>(&inner.key);
      inner.state.send_modify(|s| {
        s.apply_cached(cached, DataSource::Offline);
        s.offline = true;
        s.loading = false;
      });
      return self.state();
    }

    inner.in_flight.fetch_add(1, Ordering::SeqCst);
    inner.state.send_modify(|s| {
      s.offline = false;
      s.refreshing = true;
    });

    let outcome = (inner.fetcher)().await;
    let remaining = inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;

    match outcome {
      Ok(fresh) => {
        inner.cache.set(&inner.key, &fresh);
        let written = CacheEntry {
          data: fresh,
          timestamp: inner.cache.now_ms(),
        };
        inner.state.send_modify(|s| {
          s.apply_cached(Some(written), DataSource::Network);
          s.loading = false;
          s.refreshing = remaining > 0;
        });
      }
      Err(e) => {
        warn!(
          key = %inner.key,
          kind = %ErrorKind::Producer,
          error = %e,
          "Error fetching data, falling back to cache"
        );
        let cached = inner.cache.get_entry::<T>(&inner.key);
        inner.state.send_modify(|s| {
          s.apply_cached(cached, DataSource::Cache);
          s.loading = false;
          s.refreshing = remaining > 0;
        });
      }
    }

    self.state()
  }

  /// Store locally produced data and surface it.
  pub fn save_to_cache(&self, data: T) {
    let inner = &self.inner;
    inner.cache.set(&inner.key, &data);
    let written = CacheEntry {
      data,
      timestamp: inner.cache.now_ms(),
    };
    inner.state.send_modify(|s| {
      s.apply_cached(Some(written), DataSource::Cache);
      s.loading = false;
    });
  }

  /// Refresh every time connectivity comes back.
  ///
  /// Each reconnect refresh runs as its own task, so a producer call that never
  /// resolves does not hold up later transitions. The subscription and any
  /// refreshes still running end when the returned task is dropped.
  pub fn refresh_on_reconnect(&self) -> RefreshTask {
    let mut transitions = self.inner.connectivity.subscribe();
    let this = self.clone();

    let handle = tokio::spawn(async move {
      let mut refreshes = JoinSet::new();
      while let Some(status) = transitions.next().await {
        while refreshes.try_join_next().is_some() {}
        match status {
          Connectivity::Offline => this.inner.state.send_modify(|s| s.offline = true),
          Connectivity::Online => {
            info!(key = %this.inner.key, "back online, refreshing");
            let fetch = this.clone();
            refreshes.spawn(async move {
              fetch.refresh().await;
            });
          }
        }
      }
    });

    RefreshTask { handle }
  }
}

impl<T, S> Clone for CachedFetch<T, S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

/// Reconnect listener. Unsubscribes and aborts its refreshes when dropped.
pub struct RefreshTask {
  handle: JoinHandle<()>,
}

impl Drop for RefreshTask {
  fn drop(&mut self) {
    self.handle.abort();
  }
}
